//! Binary payload codecs for every Glonax message kind.

use crate::codec::{utf8, PayloadReader, PayloadWriter};
use crate::error::CodecError;
use crate::frame::MessageType;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Session sub-version sent in front of the user agent.
pub const SESSION_VERSION: u8 = 0x03;

/// Highest engine speed accepted on the wire.
pub const MAX_RPM: u16 = 8000;

/// Upper bound of the engine load percentages.
pub const MAX_PERCENT: u8 = 100;

/// Latency probe payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Echo {
    pub data: [u8; 4],
}

impl Echo {
    pub const SIZE: usize = 4;

    pub fn new(data: [u8; 4]) -> Self {
        Self { data }
    }

    /// Creates a probe with fresh random bytes.
    pub fn random() -> Self {
        Self {
            data: rand::random(),
        }
    }

    pub fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut reader = PayloadReader::new(buf);
        Ok(Self {
            data: reader.array()?,
        })
    }
}

/// Client identity announcement.
///
/// The user agent is not length-prefixed; it runs to the end of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub version: u8,
    pub user_agent: String,
}

impl Session {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            version: SESSION_VERSION,
            user_agent: user_agent.into(),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut writer = PayloadWriter::with_capacity(1 + self.user_agent.len());
        writer.u8(self.version).bytes(self.user_agent.as_bytes());
        writer.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut reader = PayloadReader::new(buf);
        let version = reader.u8()?;
        let user_agent = utf8(reader.rest())?;
        Ok(Self {
            version,
            user_agent,
        })
    }
}

/// Asks the control unit to emit a message of the given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub message_type: MessageType,
}

impl Request {
    pub fn new(message_type: MessageType) -> Self {
        Self { message_type }
    }

    pub fn encode(&self) -> Bytes {
        Bytes::copy_from_slice(&[self.message_type.as_u8()])
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut reader = PayloadReader::new(buf);
        let value = reader.u8()?;
        let message_type = MessageType::from_u8(value).ok_or(CodecError::InvalidEnumValue {
            field: "message type",
            value,
        })?;
        Ok(Self { message_type })
    }
}

/// Kind of machine behind the control unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    Excavator,
    WheelLoader,
    Dozer,
    Grader,
    Hauler,
    Forestry,
}

impl MachineType {
    pub fn as_u8(&self) -> u8 {
        match self {
            MachineType::Excavator => 1,
            MachineType::WheelLoader => 2,
            MachineType::Dozer => 3,
            MachineType::Grader => 4,
            MachineType::Hauler => 5,
            MachineType::Forestry => 6,
        }
    }

    pub fn from_u8(value: u8) -> Result<Self, CodecError> {
        match value {
            1 => Ok(MachineType::Excavator),
            2 => Ok(MachineType::WheelLoader),
            3 => Ok(MachineType::Dozer),
            4 => Ok(MachineType::Grader),
            5 => Ok(MachineType::Hauler),
            6 => Ok(MachineType::Forestry),
            value => Err(CodecError::InvalidEnumValue {
                field: "machine type",
                value,
            }),
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MachineType::Excavator => "excavator",
            MachineType::WheelLoader => "wheel loader",
            MachineType::Dozer => "dozer",
            MachineType::Grader => "grader",
            MachineType::Hauler => "hauler",
            MachineType::Forestry => "forestry",
        };
        f.write_str(name)
    }
}

/// Machine identity reported by the control unit at the end of the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: Uuid,
    pub machine_type: MachineType,
    /// Major, minor, patch.
    pub version: (u8, u8, u8),
    pub model: String,
    pub serial_number: String,
}

impl Instance {
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut writer =
            PayloadWriter::with_capacity(24 + self.model.len() + self.serial_number.len());
        writer
            .bytes(self.id.as_bytes())
            .u8(self.machine_type.as_u8())
            .u8(self.version.0)
            .u8(self.version.1)
            .u8(self.version.2);
        writer.string(&self.model)?.string(&self.serial_number)?;
        Ok(writer.finish())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut reader = PayloadReader::new(buf);
        let id = Uuid::from_bytes(reader.array()?);
        let machine_type = MachineType::from_u8(reader.u8()?)?;
        let version = (reader.u8()?, reader.u8()?, reader.u8()?);
        let model = reader.string()?;
        let serial_number = reader.string()?;
        Ok(Self {
            id,
            machine_type,
            version,
            model,
            serial_number,
        })
    }

    /// Returns the version as `major.minor.patch`.
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.version.0, self.version.1, self.version.2)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}) v{} [{}]",
            self.machine_type,
            self.model,
            self.serial_number,
            self.version_string(),
            self.id
        )
    }
}

/// Health report of one subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub name: String,
    pub state: u8,
    pub error_code: u8,
}

impl ModuleStatus {
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut writer = PayloadWriter::with_capacity(4 + self.name.len());
        writer.string(&self.name)?.u8(self.state).u8(self.error_code);
        Ok(writer.finish())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut reader = PayloadReader::new(buf);
        Ok(Self {
            name: reader.string()?,
            state: reader.u8()?,
            error_code: reader.u8()?,
        })
    }
}

/// Engine telemetry snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engine {
    /// Driver demand in percent, 0 to 100.
    pub driver_demand: u8,
    /// Actual engine load in percent, 0 to 100.
    pub actual_engine: u8,
    pub rpm: u16,
}

impl Engine {
    pub const SIZE: usize = 4;

    pub fn encode(&self) -> Result<Bytes, CodecError> {
        self.validate()?;
        let mut writer = PayloadWriter::with_capacity(Self::SIZE);
        writer
            .u8(self.driver_demand)
            .u8(self.actual_engine)
            .u16(self.rpm);
        Ok(writer.finish())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut reader = PayloadReader::new(buf);
        let driver_demand = reader.u8()?;
        let actual_engine = reader.u8()?;
        let rpm = reader.u16()?;
        let engine = Self {
            driver_demand,
            actual_engine,
            rpm,
        };
        engine.validate()?;
        Ok(engine)
    }

    fn validate(&self) -> Result<(), CodecError> {
        check_percent("driver_demand", self.driver_demand)?;
        check_percent("actual_engine", self.actual_engine)?;
        check_rpm(self.rpm)
    }
}

fn check_percent(field: &'static str, value: u8) -> Result<(), CodecError> {
    if value > MAX_PERCENT {
        return Err(CodecError::OutOfRange {
            field,
            value: value as u64,
        });
    }
    Ok(())
}

fn check_rpm(rpm: u16) -> Result<(), CodecError> {
    if rpm > MAX_RPM {
        return Err(CodecError::OutOfRange {
            field: "rpm",
            value: rpm as u64,
        });
    }
    Ok(())
}

/// Satellite positioning snapshot.
///
/// Floats are IEEE-754 single precision, big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gnss {
    /// Longitude, latitude.
    pub location: (f32, f32),
    pub altitude: f32,
    pub speed: f32,
    pub heading: f32,
    pub satellites: u8,
}

impl Gnss {
    pub const SIZE: usize = 21;

    pub fn encode(&self) -> Bytes {
        let mut writer = PayloadWriter::with_capacity(Self::SIZE);
        writer
            .f32(self.location.0)
            .f32(self.location.1)
            .f32(self.altitude)
            .f32(self.speed)
            .f32(self.heading)
            .u8(self.satellites);
        writer.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut reader = PayloadReader::new(buf);
        Ok(Self {
            location: (reader.f32()?, reader.f32()?),
            altitude: reader.f32()?,
            speed: reader.f32()?,
            heading: reader.f32()?,
            satellites: reader.u8()?,
        })
    }
}

/// Host metrics of the control unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vms {
    pub memory_used: u64,
    pub memory_total: u64,
    pub swap_used: u64,
    pub swap_total: u64,
    /// 1, 5 and 15 minute load averages.
    pub cpu_load: (f64, f64, f64),
    /// Uptime in seconds.
    pub uptime: u64,
    pub timestamp: DateTime<Utc>,
}

impl Vms {
    pub const SIZE: usize = 72;

    pub fn memory_used_mb(&self) -> f64 {
        self.memory_used as f64 / 1024.0 / 1024.0
    }

    pub fn memory_total_mb(&self) -> f64 {
        self.memory_total as f64 / 1024.0 / 1024.0
    }

    /// Fails with `OutOfRange` for timestamps with a sub-second part, the
    /// wire carries whole seconds only.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let nanos = self.timestamp.timestamp_subsec_nanos();
        if nanos != 0 {
            return Err(CodecError::OutOfRange {
                field: "timestamp",
                value: nanos as u64,
            });
        }
        let mut writer = PayloadWriter::with_capacity(Self::SIZE);
        writer
            .u64(self.memory_used)
            .u64(self.memory_total)
            .u64(self.swap_used)
            .u64(self.swap_total)
            .f64(self.cpu_load.0)
            .f64(self.cpu_load.1)
            .f64(self.cpu_load.2)
            .u64(self.uptime)
            .i64(self.timestamp.timestamp());
        Ok(writer.finish())
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut reader = PayloadReader::new(buf);
        let memory_used = reader.u64()?;
        let memory_total = reader.u64()?;
        let swap_used = reader.u64()?;
        let swap_total = reader.u64()?;
        let cpu_load = (reader.f64()?, reader.f64()?, reader.f64()?);
        let uptime = reader.u64()?;
        let secs = reader.i64()?;
        let timestamp = DateTime::from_timestamp(secs, 0).ok_or(CodecError::OutOfRange {
            field: "timestamp",
            value: secs as u64,
        })?;
        Ok(Self {
            memory_used,
            memory_total,
            swap_used,
            swap_total,
            cpu_load,
            uptime,
            timestamp,
        })
    }
}

/// Outbound machine command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Control {
    /// Requested engine speed in RPM.
    EngineRequest(u16),
    EngineShutdown,
    HydraulicQuickDisconnect(bool),
    HydraulicLock(bool),
    MachineShutdown,
    MachineIllumination(bool),
    MachineLights(bool),
    MachineHorn(bool),
}

impl Control {
    /// Returns the 1-byte control type tag.
    pub fn tag(&self) -> u8 {
        match self {
            Control::EngineRequest(_) => 0x01,
            Control::EngineShutdown => 0x02,
            Control::HydraulicQuickDisconnect(_) => 0x05,
            Control::HydraulicLock(_) => 0x06,
            Control::MachineShutdown => 0x1B,
            Control::MachineIllumination(_) => 0x1C,
            Control::MachineLights(_) => 0x2D,
            Control::MachineHorn(_) => 0x1E,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut writer = PayloadWriter::with_capacity(3);
        writer.u8(self.tag());
        match *self {
            Control::EngineRequest(rpm) => {
                writer.u16(rpm);
            }
            Control::HydraulicQuickDisconnect(on)
            | Control::HydraulicLock(on)
            | Control::MachineIllumination(on)
            | Control::MachineLights(on)
            | Control::MachineHorn(on) => {
                writer.u8(on as u8);
            }
            Control::EngineShutdown | Control::MachineShutdown => {}
        }
        writer.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let mut reader = PayloadReader::new(buf);
        let control = match reader.u8()? {
            0x01 => Control::EngineRequest(reader.u16()?),
            0x02 => Control::EngineShutdown,
            0x05 => Control::HydraulicQuickDisconnect(reader.bool("hydraulic quick disconnect")?),
            0x06 => Control::HydraulicLock(reader.bool("hydraulic lock")?),
            0x1B => Control::MachineShutdown,
            0x1C => Control::MachineIllumination(reader.bool("machine illumination")?),
            0x2D => Control::MachineLights(reader.bool("machine lights")?),
            0x1E => Control::MachineHorn(reader.bool("machine horn")?),
            value => {
                return Err(CodecError::InvalidEnumValue {
                    field: "control type",
                    value,
                })
            }
        };
        Ok(control)
    }
}

/// A decoded application message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Status(ModuleStatus),
    Vms(Vms),
    Gnss(Gnss),
    Engine(Engine),
    Control(Control),
    /// Application payload without a structured layout (motion, target,
    /// rotator), forwarded verbatim.
    Opaque(Bytes),
}

impl Message {
    /// Decodes the payload of an application frame.
    pub fn decode(message_type: MessageType, payload: &[u8]) -> Result<Self, CodecError> {
        let message = match message_type {
            MessageType::Status => Message::Status(ModuleStatus::decode(payload)?),
            MessageType::Vms => Message::Vms(Vms::decode(payload)?),
            MessageType::Gnss => Message::Gnss(Gnss::decode(payload)?),
            MessageType::Engine => Message::Engine(Engine::decode(payload)?),
            MessageType::Control => Message::Control(Control::decode(payload)?),
            MessageType::Motion | MessageType::Target | MessageType::Rotator => {
                Message::Opaque(Bytes::copy_from_slice(payload))
            }
            other => return Err(CodecError::NotApplication(other)),
        };
        Ok(message)
    }

    /// Returns the frame type this message travels in, if it has a fixed one.
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            Message::Status(_) => Some(MessageType::Status),
            Message::Vms(_) => Some(MessageType::Vms),
            Message::Gnss(_) => Some(MessageType::Gnss),
            Message::Engine(_) => Some(MessageType::Engine),
            Message::Control(_) => Some(MessageType::Control),
            Message::Opaque(_) => None,
        }
    }

    pub fn encode(&self) -> Result<Bytes, CodecError> {
        match self {
            Message::Status(status) => status.encode(),
            Message::Vms(vms) => vms.encode(),
            Message::Gnss(gnss) => Ok(gnss.encode()),
            Message::Engine(engine) => engine.encode(),
            Message::Control(control) => Ok(control.encode()),
            Message::Opaque(payload) => Ok(payload.clone()),
        }
    }
}
