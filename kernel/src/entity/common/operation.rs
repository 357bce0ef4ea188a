use vodca::AsRefln;

/// Page size, always within `0..=SelectLimit::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefln)]
pub struct SelectLimit(i64);

impl SelectLimit {
    pub const MAX: i64 = 100;

    pub fn new(value: impl Into<i64>) -> Self {
        SelectLimit(value.into().clamp(0, Self::MAX))
    }
}

impl Default for SelectLimit {
    fn default() -> Self {
        Self::new(30)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, AsRefln)]
pub struct SelectOffset(i64);

impl SelectOffset {
    pub fn new(value: impl Into<i64>) -> Self {
        SelectOffset(value.into().max(0))
    }
}
