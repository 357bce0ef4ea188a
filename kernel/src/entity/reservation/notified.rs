use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Fromln, AsRefln, Serialize, Deserialize)]
pub struct IsNotified(bool);

impl IsNotified {
    pub fn new(value: impl Into<bool>) -> Self {
        Self(value.into())
    }
}
