//! Stream sources and constants visible from every scope.

use verse_core::{RegistrationError, Type, Value};
use verse_registry::NativeRegistry;

/// Milliseconds since evaluation started, emitted by the host's clock.
pub const TIME: &str = "Time";
/// Text of the most recent key pressed.
pub const KEY: &str = "Key";
pub const PI: &str = "π";

pub fn install(registry: &mut NativeRegistry) -> Result<(), RegistrationError> {
    registry.register_stream(TIME, Type::measurement("ms"))?;
    registry.register_stream(KEY, Type::text())?;
    registry.register_constant(PI, Value::number(std::f64::consts::PI))?;
    Ok(())
}
