#[macro_use]
extern crate enum_as_inner;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate bitflags;

pub mod logger;
pub mod assembler;
pub mod interpreter;
pub use assembler::*;
pub use interpreter::*;
