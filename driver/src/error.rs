use kernel::KernelError;

/// Maps a backend error onto the kernel's error kinds.
pub trait ConvertError {
    type Ok;
    fn convert_error(self) -> error_stack::Result<Self::Ok, KernelError>;
}
