//! DAC drivers.
//!
//! - `mcp4921`: bit-banged MCP4921 on three GPIOs
//!
//! Host tests use `platform::mocks::RecordingDac`.

pub mod mcp4921;

pub use mcp4921::Mcp4921;
