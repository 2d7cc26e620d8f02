//! Control command parsing for the `control` subcommand.

use clap::ValueEnum;
use glonax_protocol::message::MAX_RPM;
use glonax_protocol::Control;

/// Control command kinds accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ControlKind {
    Horn,
    Lights,
    Illumination,
    HydraulicLock,
    QuickDisconnect,
    EngineRequest,
    EngineShutdown,
    MachineShutdown,
}

/// Builds a control command from its kind and optional argument.
///
/// Switches take `on`/`off` (also `true`/`false`, `1`/`0`), engine
/// requests take an RPM, shutdowns take nothing.
pub fn parse_control(kind: ControlKind, value: Option<&str>) -> Result<Control, String> {
    let control = match kind {
        ControlKind::Horn => Control::MachineHorn(switch(kind, value)?),
        ControlKind::Lights => Control::MachineLights(switch(kind, value)?),
        ControlKind::Illumination => Control::MachineIllumination(switch(kind, value)?),
        ControlKind::HydraulicLock => Control::HydraulicLock(switch(kind, value)?),
        ControlKind::QuickDisconnect => Control::HydraulicQuickDisconnect(switch(kind, value)?),
        ControlKind::EngineRequest => {
            let value = value.ok_or("engine-request requires an RPM value")?;
            let rpm: u16 = value
                .parse()
                .map_err(|_| format!("invalid RPM '{}'", value))?;
            if rpm > MAX_RPM {
                return Err(format!("RPM {} exceeds maximum of {}", rpm, MAX_RPM));
            }
            Control::EngineRequest(rpm)
        }
        ControlKind::EngineShutdown => no_value(kind, value, Control::EngineShutdown)?,
        ControlKind::MachineShutdown => no_value(kind, value, Control::MachineShutdown)?,
    };
    Ok(control)
}

fn switch(kind: ControlKind, value: Option<&str>) -> Result<bool, String> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("on" | "true" | "1") => Ok(true),
        Some("off" | "false" | "0") => Ok(false),
        Some(other) => Err(format!("invalid switch value '{}', expected on or off", other)),
        None => Err(format!("{:?} requires on or off", kind)),
    }
}

fn no_value(kind: ControlKind, value: Option<&str>, control: Control) -> Result<Control, String> {
    match value {
        Some(v) => Err(format!("{:?} takes no value, got '{}'", kind, v)),
        None => Ok(control),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switches() {
        assert_eq!(
            parse_control(ControlKind::Horn, Some("on")),
            Ok(Control::MachineHorn(true))
        );
        assert_eq!(
            parse_control(ControlKind::HydraulicLock, Some("OFF")),
            Ok(Control::HydraulicLock(false))
        );
        assert_eq!(
            parse_control(ControlKind::QuickDisconnect, Some("1")),
            Ok(Control::HydraulicQuickDisconnect(true))
        );
        assert!(parse_control(ControlKind::Lights, None).is_err());
        assert!(parse_control(ControlKind::Lights, Some("maybe")).is_err());
    }

    #[test]
    fn test_engine_request() {
        assert_eq!(
            parse_control(ControlKind::EngineRequest, Some("1500")),
            Ok(Control::EngineRequest(1500))
        );
        assert_eq!(
            parse_control(ControlKind::EngineRequest, Some("8000")),
            Ok(Control::EngineRequest(8000))
        );
        assert!(parse_control(ControlKind::EngineRequest, Some("8001")).is_err());
        assert!(parse_control(ControlKind::EngineRequest, Some("-1")).is_err());
        assert!(parse_control(ControlKind::EngineRequest, None).is_err());
    }

    #[test]
    fn test_shutdowns() {
        assert_eq!(
            parse_control(ControlKind::EngineShutdown, None),
            Ok(Control::EngineShutdown)
        );
        assert_eq!(
            parse_control(ControlKind::MachineShutdown, None),
            Ok(Control::MachineShutdown)
        );
        assert!(parse_control(ControlKind::MachineShutdown, Some("now")).is_err());
    }
}
