use crate::MemoryConnection;
use tether_core::Driver;

#[derive(Clone, Copy, Default, Debug)]
pub struct MemoryDriver;
impl MemoryDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for MemoryDriver {
    type Connection = MemoryConnection;
    const NAME: &'static str = "memory";
}
