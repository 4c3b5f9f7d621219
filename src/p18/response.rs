use crate::prelude::*;
use crate::format::{Content, Field, Unit, Value};
use crate::p18::fields::{self, w, FieldLength, Fields};
use crate::p18::types::*;
use crate::transport::crc;

use enum_dispatch::*;

/// Anything the formatter can lay out.
#[enum_dispatch]
pub trait Record {
    fn content(&self) -> Content;
}

/// One decoded answer from the device, or an error in its place.
#[enum_dispatch(Record)]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    ProtocolId(ProtocolId),
    CurrentTime(CurrentTime),
    Generated(Generated),
    SerialNumber(SerialNumber),
    CpuVersion(CpuVersion),
    RatedInformation(RatedInformation),
    GeneralStatus(GeneralStatus),
    WorkingMode(Mode),
    FaultsAndWarnings(FaultsAndWarnings),
    FlagsAndStatuses(FlagsAndStatuses),
    RatedDefaults(RatedDefaults),
    AllowedCurrents(AllowedCurrents),
    ParallelRatedInformation(ParallelRatedInformation),
    ParallelGeneralStatus(ParallelGeneralStatus),
    TimeBucket(TimeBucket),
    Set(SetAck),
    Error(ErrorResponse),
}

impl Response {
    /// Checks the frame structure of `raw` (checksum and terminator already
    /// stripped) and unpacks it into the record `kind` answers with.
    pub fn decode(kind: CommandKind, raw: &[u8]) -> Result<Self> {
        use CommandKind::*;

        if kind.is_set() {
            return Ok(SetAck::decode(raw)?.into());
        }

        let data = get_payload(raw)?;

        let response = match kind {
            GetProtocolId => ProtocolId::decode(data)?.into(),
            GetCurrentTime => CurrentTime::decode(data)?.into(),
            GetTotalGenerated | GetYearGenerated | GetMonthGenerated | GetDayGenerated => {
                Generated::decode(data)?.into()
            }
            GetSerialNumber => SerialNumber::decode(data)?.into(),
            GetCpuVersion => CpuVersion::decode(data)?.into(),
            GetRatedInformation => RatedInformation::decode(data)?.into(),
            GetGeneralStatus => GeneralStatus::decode(data)?.into(),
            GetWorkingMode => Mode::decode(data)?.into(),
            GetFaultsAndWarnings => FaultsAndWarnings::decode(data)?.into(),
            GetFlagsAndStatuses => FlagsAndStatuses::decode(data)?.into(),
            GetRatedDefaults => RatedDefaults::decode(data)?.into(),
            GetAllowedChargeCurrents | GetAllowedAcChargeCurrents => {
                AllowedCurrents::decode(data)?.into()
            }
            GetParallelRatedInformation => ParallelRatedInformation::decode(data)?.into(),
            GetParallelGeneralStatus => ParallelGeneralStatus::decode(data)?.into(),
            GetAcChargeTimeBucket | GetAcSupplyTimeBucket => TimeBucket::decode(data)?.into(),
            _ => {
                return Err(Error::Internal(format!(
                    "{:?} has no response layout",
                    kind
                )))
            }
        };

        Ok(response)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse {
            message: message.into(),
        })
    }
}

/// Validates a `^Dnnn` header and returns the payload behind it.
///
/// The declared length counts the payload plus the checksum and the
/// terminator, which are gone by the time a response gets here.
fn get_payload(raw: &[u8]) -> Result<&str> {
    if raw.len() < 5 {
        return Err(Error::InvalidResponse(format!(
            "response is too short ({} bytes)",
            raw.len()
        )));
    }

    if &raw[..2] != b"^D" {
        return Err(Error::InvalidResponse(
            "response does not start with ^D".to_string(),
        ));
    }

    let declared = std::str::from_utf8(&raw[2..5])
        .ok()
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| Error::InvalidResponse("response length is not a number".to_string()))?;

    let payload = &raw[5..];
    if declared > payload.len() + crc::SIZE + 1 {
        return Err(Error::InvalidResponse(format!(
            "response declares {} bytes, got {}",
            declared,
            payload.len() + crc::SIZE + 1
        )));
    }

    std::str::from_utf8(payload)
        .map_err(|_| Error::InvalidResponse("response is not ASCII".to_string()))
}

fn table(fields: Vec<Field>) -> Content {
    Content::Table(fields)
}

// ProtocolId {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolId {
    pub id: u32,
}

impl ProtocolId {
    fn decode(data: &str) -> Result<Self> {
        let id = fields::number("ProtocolId", fields::fixed("ProtocolId", data, 0, 2)?)?;
        Ok(Self { id })
    }
}

impl Record for ProtocolId {
    fn content(&self) -> Content {
        table(vec![Field::new("id", "Protocol ID", self.id)])
    }
} // }}}

// CurrentTime {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CurrentTime {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CurrentTime {
    const NAME: &'static str = "CurrentTime";

    fn decode(data: &str) -> Result<Self> {
        let part = |start, len| fields::number(Self::NAME, fields::fixed(Self::NAME, data, start, len)?);

        Ok(Self {
            year: part(0, 4)?,
            month: part(4, 2)?,
            day: part(6, 2)?,
            hour: part(8, 2)?,
            minute: part(10, 2)?,
            second: part(12, 2)?,
        })
    }
}

impl Record for CurrentTime {
    fn content(&self) -> Content {
        table(vec![
            Field::new("year", "Year", self.year),
            Field::new("month", "Month", self.month),
            Field::new("day", "Day", self.day),
            Field::new("hour", "Hour", self.hour),
            Field::new("minute", "Minute", self.minute),
            Field::new("second", "Second", self.second),
        ])
    }
} // }}}

// Generated {{{
/// Energy counter shared by the total, year, month and day queries.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Generated {
    pub wh: u32,
}

impl Generated {
    fn decode(data: &str) -> Result<Self> {
        let wh = fields::number("Generated", fields::fixed("Generated", data, 0, 8)?)?;
        Ok(Self { wh })
    }
}

impl Record for Generated {
    fn content(&self) -> Content {
        table(vec![Field::new("wh", "Wh", self.wh)])
    }
} // }}}

// SerialNumber {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SerialNumber {
    pub id: String,
}

impl SerialNumber {
    const NAME: &'static str = "SerialNumber";

    fn decode(data: &str) -> Result<Self> {
        let len = fields::number(Self::NAME, fields::fixed(Self::NAME, data, 0, 2)?)? as usize;
        let id = fields::fixed(Self::NAME, data, 2, len)?.to_string();
        Ok(Self { id })
    }
}

impl Record for SerialNumber {
    fn content(&self) -> Content {
        table(vec![Field::new("sn", "Serial number", self.id.as_str())])
    }
} // }}}

// CpuVersion {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CpuVersion {
    pub main: String,
    pub slave1: String,
    pub slave2: String,
}

impl CpuVersion {
    fn decode(data: &str) -> Result<Self> {
        let f = Fields::split("CpuVersion", data, &[w(5), w(5), w(5)], None)?;
        Ok(Self {
            main: f.text(0)?,
            slave1: f.text(1)?,
            slave2: f.text(2)?,
        })
    }
}

impl Record for CpuVersion {
    fn content(&self) -> Content {
        table(vec![
            Field::new("main_v", "Main CPU version", self.main.as_str()),
            Field::new("slave1_v", "Slave 1 CPU version", self.slave1.as_str()),
            Field::new("slave2_v", "Slave 2 CPU version", self.slave2.as_str()),
        ])
    }
} // }}}

// RatedInformation {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RatedInformation {
    pub ac_input_rating_voltage: u32,
    pub ac_input_rating_current: u32,
    pub ac_output_rating_voltage: u32,
    pub ac_output_rating_freq: u32,
    pub ac_output_rating_current: u32,
    pub ac_output_rating_apparent_power: u32,
    pub ac_output_rating_active_power: u32,
    pub battery_rating_voltage: u32,
    pub battery_recharge_voltage: u32,
    pub battery_redischarge_voltage: u32,
    pub battery_under_voltage: u32,
    pub battery_bulk_voltage: u32,
    pub battery_float_voltage: u32,
    pub battery_type: BatteryType,
    pub max_ac_charge_current: u32,
    pub max_charge_current: u32,
    pub input_voltage_range: InputVoltageRange,
    pub output_source_priority: OutputSourcePriority,
    pub charge_source_priority: ChargeSourcePriority,
    pub parallel_max_num: u32,
    pub machine_type: MachineType,
    pub topology: Topology,
    pub output_mode: OutputMode,
    pub solar_power_priority: SolarPowerPriority,
    pub mppt: String,
}

impl RatedInformation {
    const LENGTHS: [FieldLength; 25] = [
        w(4), w(3), w(4), w(3), w(3), w(4), w(4), w(3), w(3), w(3), w(3), w(3), w(3),
        w(1), FieldLength::range(2, 3), w(3),
        w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1),
    ];

    fn decode(data: &str) -> Result<Self> {
        let f = Fields::split("RatedInformation", data, &Self::LENGTHS, None)?;

        Ok(Self {
            ac_input_rating_voltage: f.u32(0)?,
            ac_input_rating_current: f.u32(1)?,
            ac_output_rating_voltage: f.u32(2)?,
            ac_output_rating_freq: f.u32(3)?,
            ac_output_rating_current: f.u32(4)?,
            ac_output_rating_apparent_power: f.u32(5)?,
            ac_output_rating_active_power: f.u32(6)?,
            battery_rating_voltage: f.u32(7)?,
            battery_recharge_voltage: f.u32(8)?,
            battery_redischarge_voltage: f.u32(9)?,
            battery_under_voltage: f.u32(10)?,
            battery_bulk_voltage: f.u32(11)?,
            battery_float_voltage: f.u32(12)?,
            battery_type: f.enumeration(13)?,
            max_ac_charge_current: f.u32(14)?,
            max_charge_current: f.u32(15)?,
            input_voltage_range: f.enumeration(16)?,
            output_source_priority: f.enumeration(17)?,
            charge_source_priority: f.enumeration(18)?,
            parallel_max_num: f.u32(19)?,
            machine_type: f.enumeration(20)?,
            topology: f.enumeration(21)?,
            output_mode: f.enumeration(22)?,
            solar_power_priority: f.enumeration(23)?,
            mppt: f.text(24)?,
        })
    }
}

impl Record for RatedInformation {
    fn content(&self) -> Content {
        table(vec![
            Field::new("ac_input_rating_voltage", "AC input rating voltage", Value::tenths(self.ac_input_rating_voltage)).unit(Unit::V),
            Field::new("ac_input_rating_current", "AC input rating current", Value::tenths(self.ac_input_rating_current)).unit(Unit::A),
            Field::new("ac_output_rating_voltage", "AC output rating voltage", Value::tenths(self.ac_output_rating_voltage)).unit(Unit::V),
            Field::new("ac_output_rating_freq", "AC output rating frequency", Value::tenths(self.ac_output_rating_freq)).unit(Unit::Hz),
            Field::new("ac_output_rating_current", "AC output rating current", Value::tenths(self.ac_output_rating_current)).unit(Unit::A),
            Field::new("ac_output_rating_apparent_power", "AC output rating apparent power", self.ac_output_rating_apparent_power).unit(Unit::VA),
            Field::new("ac_output_rating_active_power", "AC output rating active power", self.ac_output_rating_active_power).unit(Unit::Wh),
            Field::new("battery_rating_voltage", "Battery rating voltage", Value::tenths(self.battery_rating_voltage)).unit(Unit::V),
            Field::new("battery_recharge_voltage", "Battery re-charge voltage", Value::tenths(self.battery_recharge_voltage)).unit(Unit::V),
            Field::new("battery_redischarge_voltage", "Battery re-discharge voltage", Value::tenths(self.battery_redischarge_voltage)).unit(Unit::V),
            Field::new("battery_under_voltage", "Battery under voltage", Value::tenths(self.battery_under_voltage)).unit(Unit::V),
            Field::new("battery_bulk_voltage", "Battery bulk voltage", Value::tenths(self.battery_bulk_voltage)).unit(Unit::V),
            Field::new("battery_float_voltage", "Battery float voltage", Value::tenths(self.battery_float_voltage)).unit(Unit::V),
            Field::new("battery_type", "Battery type", Value::label(self.battery_type)),
            Field::new("max_charge_current", "Max charge current", self.max_charge_current).unit(Unit::A),
            Field::new("max_ac_charge_current", "Max AC charge current", self.max_ac_charge_current).unit(Unit::A),
            Field::new("input_voltage_range", "Input voltage range", Value::label(self.input_voltage_range)),
            Field::new("output_source_priority", "Output source priority", Value::label(self.output_source_priority)),
            Field::new("charge_source_priority", "Charge source priority", Value::label(self.charge_source_priority)),
            Field::new("parallel_max_num", "Parallel max num", self.parallel_max_num),
            Field::new("machine_type", "Machine type", Value::label(self.machine_type)),
            Field::new("topology", "Topology", Value::label(self.topology)),
            Field::new("output_mode", "Output mode", Value::label(self.output_mode)),
            Field::new("solar_power_priority", "Solar power priority", Value::label(self.solar_power_priority)),
            Field::new("mppt", "MPPT string", self.mppt.as_str()),
        ])
    }
} // }}}

// GeneralStatus {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneralStatus {
    pub grid_voltage: u32,
    pub grid_freq: u32,
    pub ac_output_voltage: u32,
    pub ac_output_freq: u32,
    pub ac_output_apparent_power: u32,
    pub ac_output_active_power: u32,
    pub output_load_percent: u32,
    pub battery_voltage: u32,
    pub battery_voltage_scc: u32,
    pub battery_voltage_scc2: u32,
    pub battery_discharge_current: u32,
    pub battery_charge_current: u32,
    pub battery_capacity: u32,
    pub inverter_heat_sink_temp: u32,
    pub mppt1_charger_temp: u32,
    pub mppt2_charger_temp: u32,
    pub pv1_input_power: u32,
    pub pv2_input_power: u32,
    pub pv1_input_voltage: u32,
    pub pv2_input_voltage: u32,
    pub configuration_status: ConfigurationStatus,
    pub mppt1_charger_status: MpptChargerStatus,
    pub mppt2_charger_status: MpptChargerStatus,
    pub load_connected: LoadConnectionStatus,
    pub battery_power_direction: BatteryPowerDirection,
    pub dc_ac_power_direction: DcAcPowerDirection,
    pub line_power_direction: LinePowerDirection,
    pub local_parallel_id: u32,
}

impl GeneralStatus {
    const LENGTHS: [FieldLength; 28] = [
        w(4), w(3), w(4), w(3), w(4), w(4), w(3), w(3), w(3), w(3),
        w(3), w(3), w(3), w(3), w(3), w(3), w(4), w(4), w(4), w(4),
        w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1),
    ];

    fn decode(data: &str) -> Result<Self> {
        let f = Fields::split("GeneralStatus", data, &Self::LENGTHS, None)?;

        Ok(Self {
            grid_voltage: f.u32(0)?,
            grid_freq: f.u32(1)?,
            ac_output_voltage: f.u32(2)?,
            ac_output_freq: f.u32(3)?,
            ac_output_apparent_power: f.u32(4)?,
            ac_output_active_power: f.u32(5)?,
            output_load_percent: f.u32(6)?,
            battery_voltage: f.u32(7)?,
            battery_voltage_scc: f.u32(8)?,
            battery_voltage_scc2: f.u32(9)?,
            battery_discharge_current: f.u32(10)?,
            battery_charge_current: f.u32(11)?,
            battery_capacity: f.u32(12)?,
            inverter_heat_sink_temp: f.u32(13)?,
            mppt1_charger_temp: f.u32(14)?,
            mppt2_charger_temp: f.u32(15)?,
            pv1_input_power: f.u32(16)?,
            pv2_input_power: f.u32(17)?,
            pv1_input_voltage: f.u32(18)?,
            pv2_input_voltage: f.u32(19)?,
            configuration_status: f.enumeration(20)?,
            mppt1_charger_status: f.enumeration(21)?,
            mppt2_charger_status: f.enumeration(22)?,
            load_connected: f.enumeration(23)?,
            battery_power_direction: f.enumeration(24)?,
            dc_ac_power_direction: f.enumeration(25)?,
            line_power_direction: f.enumeration(26)?,
            local_parallel_id: f.u32(27)?,
        })
    }
}

impl Record for GeneralStatus {
    fn content(&self) -> Content {
        table(vec![
            Field::new("grid_voltage", "Grid voltage", Value::tenths(self.grid_voltage)).unit(Unit::V),
            Field::new("grid_freq", "Grid frequency", Value::tenths(self.grid_freq)).unit(Unit::Hz),
            Field::new("ac_output_voltage", "AC output voltage", Value::tenths(self.ac_output_voltage)).unit(Unit::V),
            Field::new("ac_output_freq", "AC output frequency", Value::tenths(self.ac_output_freq)).unit(Unit::Hz),
            Field::new("ac_output_apparent_power", "AC output apparent power", self.ac_output_apparent_power).unit(Unit::VA),
            Field::new("ac_output_active_power", "AC output active power", self.ac_output_active_power).unit(Unit::Wh),
            Field::new("output_load_percent", "Output load percent", self.output_load_percent).unit(Unit::Percentage),
            Field::new("battery_voltage", "Battery voltage", Value::tenths(self.battery_voltage)).unit(Unit::V),
            Field::new("battery_voltage_scc", "Battery voltage from SCC", Value::tenths(self.battery_voltage_scc)).unit(Unit::V),
            Field::new("battery_voltage_scc2", "Battery voltage from SCC2", Value::tenths(self.battery_voltage_scc2)).unit(Unit::V),
            Field::new("battery_discharge_current", "Battery discharge current", self.battery_discharge_current).unit(Unit::A),
            Field::new("battery_charge_current", "Battery charge current", self.battery_charge_current).unit(Unit::A),
            Field::new("battery_capacity", "Battery capacity", self.battery_capacity).unit(Unit::Percentage),
            Field::new("inverter_heat_sink_temp", "Inverter heat sink temperature", self.inverter_heat_sink_temp).unit(Unit::Celsius),
            Field::new("mppt1_charger_temp", "MPPT1 charger temperature", self.mppt1_charger_temp).unit(Unit::Celsius),
            Field::new("mppt2_charger_temp", "MPPT2 charger temperature", self.mppt2_charger_temp).unit(Unit::Celsius),
            Field::new("pv1_input_power", "PV1 input power", self.pv1_input_power).unit(Unit::Wh),
            Field::new("pv2_input_power", "PV2 input power", self.pv2_input_power).unit(Unit::Wh),
            Field::new("pv1_input_voltage", "PV1 input voltage", Value::tenths(self.pv1_input_voltage)).unit(Unit::V),
            Field::new("pv2_input_voltage", "PV2 input voltage", Value::tenths(self.pv2_input_voltage)).unit(Unit::V),
            Field::new("configuration_status", "Configuration state", Value::label(self.configuration_status)),
            Field::new("mppt1_charger_status", "MPPT1 charger status", Value::label(self.mppt1_charger_status)),
            Field::new("mppt2_charger_status", "MPPT2 charger status", Value::label(self.mppt2_charger_status)),
            Field::new("load_connected", "Load connection", Value::label(self.load_connected)),
            Field::new("battery_power_direction", "Battery power direction", Value::label(self.battery_power_direction)),
            Field::new("dc_ac_power_direction", "DC/AC power direction", Value::label(self.dc_ac_power_direction)),
            Field::new("line_power_direction", "Line power direction", Value::label(self.line_power_direction)),
            Field::new("local_parallel_id", "Local parallel ID", self.local_parallel_id),
        ])
    }
} // }}}

// Mode {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Mode {
    pub mode: WorkingMode,
}

impl Mode {
    fn decode(data: &str) -> Result<Self> {
        let value = fields::number("WorkingMode", fields::fixed("WorkingMode", data, 0, 2)?)?;
        let mode = u8::try_from(value)
            .ok()
            .and_then(|v| WorkingMode::try_from(v).ok())
            .ok_or_else(|| {
                Error::Parse(format!("while parsing WorkingMode: unknown mode {}", value))
            })?;

        Ok(Self { mode })
    }
}

impl Record for Mode {
    fn content(&self) -> Content {
        table(vec![Field::new("mode", "Working mode", Value::label(self.mode))])
    }
} // }}}

// FaultsAndWarnings {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FaultsAndWarnings {
    pub fault_code: u32,
    pub line_fail: bool,
    pub output_circuit_short: bool,
    pub inverter_over_temperature: bool,
    pub fan_lock: bool,
    pub battery_voltage_high: bool,
    pub battery_low: bool,
    pub battery_under: bool,
    pub over_load: bool,
    pub eeprom_fail: bool,
    pub power_limit: bool,
    pub pv1_voltage_high: bool,
    pub pv2_voltage_high: bool,
    pub mppt1_overload_warning: bool,
    pub mppt2_overload_warning: bool,
    pub battery_too_low_to_charge_for_scc1: bool,
    pub battery_too_low_to_charge_for_scc2: bool,
}

impl FaultsAndWarnings {
    fn decode(data: &str) -> Result<Self> {
        let mut lengths = vec![w(2)];
        lengths.extend([w(1); 16]);
        let f = Fields::split("FaultsAndWarnings", data, &lengths, None)?;

        Ok(Self {
            fault_code: f.u32(0)?,
            line_fail: f.flag(1)?,
            output_circuit_short: f.flag(2)?,
            inverter_over_temperature: f.flag(3)?,
            fan_lock: f.flag(4)?,
            battery_voltage_high: f.flag(5)?,
            battery_low: f.flag(6)?,
            battery_under: f.flag(7)?,
            over_load: f.flag(8)?,
            eeprom_fail: f.flag(9)?,
            power_limit: f.flag(10)?,
            pv1_voltage_high: f.flag(11)?,
            pv2_voltage_high: f.flag(12)?,
            mppt1_overload_warning: f.flag(13)?,
            mppt2_overload_warning: f.flag(14)?,
            battery_too_low_to_charge_for_scc1: f.flag(15)?,
            battery_too_low_to_charge_for_scc2: f.flag(16)?,
        })
    }
}

impl Record for FaultsAndWarnings {
    fn content(&self) -> Content {
        let mut fields = vec![Field::new("fault_code", "Fault code", self.fault_code)];

        if let Some(description) = FaultCodeString::from_value(self.fault_code) {
            fields.push(Field::new("fault_description", "Fault description", description));
        }

        fields.extend([
            Field::new("line_fail", "Line fail", self.line_fail),
            Field::new("output_circuit_short", "Output circuit short", self.output_circuit_short),
            Field::new("inverter_over_temperature", "Inverter over temperature", self.inverter_over_temperature),
            Field::new("fan_lock", "Fan lock", self.fan_lock),
            Field::new("battery_voltage_high", "Battery voltage high", self.battery_voltage_high),
            Field::new("battery_low", "Battery low", self.battery_low),
            Field::new("battery_under", "Battery under", self.battery_under),
            Field::new("over_load", "Over load", self.over_load),
            Field::new("eeprom_fail", "EEPROM fail", self.eeprom_fail),
            Field::new("power_limit", "Power limit", self.power_limit),
            Field::new("pv1_voltage_high", "PV1 voltage high", self.pv1_voltage_high),
            Field::new("pv2_voltage_high", "PV2 voltage high", self.pv2_voltage_high),
            Field::new("mppt1_overload_warning", "MPPT1 overload warning", self.mppt1_overload_warning),
            Field::new("mppt2_overload_warning", "MPPT2 overload warning", self.mppt2_overload_warning),
            Field::new("battery_too_low_to_charge_for_scc1", "Battery too low to charge for SCC1", self.battery_too_low_to_charge_for_scc1),
            Field::new("battery_too_low_to_charge_for_scc2", "Battery too low to charge for SCC2", self.battery_too_low_to_charge_for_scc2),
        ]);

        table(fields)
    }
} // }}}

// FlagsAndStatuses {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlagsAndStatuses {
    pub buzzer: bool,
    pub overload_bypass: bool,
    pub lcd_escape_to_default_page_after_1min_timeout: bool,
    pub overload_restart: bool,
    pub over_temp_restart: bool,
    pub backlight_on: bool,
    pub alarm_on_primary_source_interrupt: bool,
    pub fault_code_record: bool,
    pub reserved: String,
}

impl FlagsAndStatuses {
    fn decode(data: &str) -> Result<Self> {
        let f = Fields::split("FlagsAndStatuses", data, &[w(1); 9], None)?;

        Ok(Self {
            buzzer: f.flag(0)?,
            overload_bypass: f.flag(1)?,
            lcd_escape_to_default_page_after_1min_timeout: f.flag(2)?,
            overload_restart: f.flag(3)?,
            over_temp_restart: f.flag(4)?,
            backlight_on: f.flag(5)?,
            alarm_on_primary_source_interrupt: f.flag(6)?,
            fault_code_record: f.flag(7)?,
            reserved: f.text(8)?,
        })
    }
}

impl Record for FlagsAndStatuses {
    fn content(&self) -> Content {
        table(vec![
            Field::new("buzzer", "Buzzer", self.buzzer),
            Field::new("overload_bypass", "Overload bypass function", self.overload_bypass),
            Field::new(
                "escape_to_default_screen_after_1min_timeout",
                "Escape to default screen after 1min timeout",
                self.lcd_escape_to_default_page_after_1min_timeout,
            ),
            Field::new("overload_restart", "Overload restart", self.overload_restart),
            Field::new("over_temp_restart", "Over temperature restart", self.over_temp_restart),
            Field::new("backlight_on", "Backlight on", self.backlight_on),
            Field::new(
                "alarm_on_on_primary_source_interrupt",
                "Alarm on on primary source interrupt",
                self.alarm_on_primary_source_interrupt,
            ),
            Field::new("fault_code_record", "Fault code record", self.fault_code_record),
        ])
    }
} // }}}

// RatedDefaults {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RatedDefaults {
    pub ac_output_voltage: u32,
    pub ac_output_freq: u32,
    pub ac_input_voltage_range: InputVoltageRange,
    pub battery_under_voltage: u32,
    pub charging_float_voltage: u32,
    pub charging_bulk_voltage: u32,
    pub battery_recharge_voltage: u32,
    pub battery_redischarge_voltage: u32,
    pub max_charge_current: u32,
    pub max_ac_charge_current: u32,
    pub battery_type: BatteryType,
    pub output_source_priority: OutputSourcePriority,
    pub charge_source_priority: ChargeSourcePriority,
    pub solar_power_priority: SolarPowerPriority,
    pub machine_type: MachineType,
    pub output_mode: OutputMode,
    pub flag_buzzer: bool,
    pub flag_overload_restart: bool,
    pub flag_over_temp_restart: bool,
    pub flag_backlight_on: bool,
    pub flag_alarm_on_primary_source_interrupt: bool,
    pub flag_fault_code_record: bool,
    pub flag_overload_bypass: bool,
    pub flag_lcd_escape_to_default_page_after_1min_timeout: bool,
}

impl RatedDefaults {
    const LENGTHS: [FieldLength; 24] = [
        w(4), w(3), w(1), w(3), w(3), w(3), w(3), w(3), w(3), w(2),
        w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1), w(1),
    ];

    fn decode(data: &str) -> Result<Self> {
        let f = Fields::split("RatedDefaults", data, &Self::LENGTHS, None)?;

        Ok(Self {
            ac_output_voltage: f.u32(0)?,
            ac_output_freq: f.u32(1)?,
            ac_input_voltage_range: f.enumeration(2)?,
            battery_under_voltage: f.u32(3)?,
            charging_float_voltage: f.u32(4)?,
            charging_bulk_voltage: f.u32(5)?,
            battery_recharge_voltage: f.u32(6)?,
            battery_redischarge_voltage: f.u32(7)?,
            max_charge_current: f.u32(8)?,
            max_ac_charge_current: f.u32(9)?,
            battery_type: f.enumeration(10)?,
            output_source_priority: f.enumeration(11)?,
            charge_source_priority: f.enumeration(12)?,
            solar_power_priority: f.enumeration(13)?,
            machine_type: f.enumeration(14)?,
            output_mode: f.enumeration(15)?,
            flag_buzzer: f.flag(16)?,
            flag_overload_restart: f.flag(17)?,
            flag_over_temp_restart: f.flag(18)?,
            flag_backlight_on: f.flag(19)?,
            flag_alarm_on_primary_source_interrupt: f.flag(20)?,
            flag_fault_code_record: f.flag(21)?,
            flag_overload_bypass: f.flag(22)?,
            flag_lcd_escape_to_default_page_after_1min_timeout: f.flag(23)?,
        })
    }
}

impl Record for RatedDefaults {
    fn content(&self) -> Content {
        table(vec![
            Field::new("ac_output_voltage", "AC output voltage", Value::tenths(self.ac_output_voltage)).unit(Unit::V),
            Field::new("ac_output_freq", "AC output frequency", Value::tenths(self.ac_output_freq)).unit(Unit::Hz),
            Field::new("ac_input_voltage_range", "AC input voltage range", Value::label(self.ac_input_voltage_range)),
            Field::new("battery_under_voltage", "Battery under voltage", Value::tenths(self.battery_under_voltage)).unit(Unit::V),
            Field::new("battery_bulk_voltage", "Charging bulk voltage", Value::tenths(self.charging_bulk_voltage)).unit(Unit::V),
            Field::new("battery_float_voltage", "Charging float voltage", Value::tenths(self.charging_float_voltage)).unit(Unit::V),
            Field::new("battery_recharge_voltage", "Battery re-charge voltage", Value::tenths(self.battery_recharge_voltage)).unit(Unit::V),
            Field::new("battery_redischarge_voltage", "Battery re-discharge voltage", Value::tenths(self.battery_redischarge_voltage)).unit(Unit::V),
            Field::new("max_charge_current", "Max charge current", self.max_charge_current).unit(Unit::A),
            Field::new("max_ac_charge_current", "Max AC charge current", self.max_ac_charge_current).unit(Unit::A),
            Field::new("battery_type", "Battery type", Value::label(self.battery_type)),
            Field::new("output_source_priority", "Output source priority", Value::label(self.output_source_priority)),
            Field::new("charge_source_priority", "Charge source priority", Value::label(self.charge_source_priority)),
            Field::new("solar_power_priority", "Solar power priority", Value::label(self.solar_power_priority)),
            Field::new("machine_type", "Machine type", Value::label(self.machine_type)),
            Field::new("output_mode", "Output mode", Value::label(self.output_mode)),
            Field::new("buzzer_flag", "Buzzer flag", self.flag_buzzer),
            Field::new("overload_bypass_flag", "Overload bypass function flag", self.flag_overload_bypass),
            Field::new(
                "escape_to_default_screen_after_1min_timeout_flag",
                "Escape to default screen after 1min timeout flag",
                self.flag_lcd_escape_to_default_page_after_1min_timeout,
            ),
            Field::new("overload_restart_flag", "Overload restart flag", self.flag_overload_restart),
            Field::new("over_temp_restart_flag", "Over temperature restart flag", self.flag_over_temp_restart),
            Field::new("backlight_on_flag", "Backlight on flag", self.flag_backlight_on),
            Field::new(
                "alarm_on_on_primary_source_interrupt_flag",
                "Alarm on on primary source interrupt flag",
                self.flag_alarm_on_primary_source_interrupt,
            ),
            Field::new("fault_code_record_flag", "Fault code record flag", self.flag_fault_code_record),
        ])
    }
} // }}}

// AllowedCurrents {{{
/// Selectable charge currents, in amps. The device decides how many.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AllowedCurrents {
    pub amps: Vec<u32>,
}

impl AllowedCurrents {
    fn decode(data: &str) -> Result<Self> {
        let amps = Fields::split("AllowedCurrents", data, &[], None)?.all_u32()?;
        Ok(Self { amps })
    }
}

impl Record for AllowedCurrents {
    fn content(&self) -> Content {
        Content::List(self.amps.iter().map(|&a| Value::from(a)).collect())
    }
} // }}}

// ParallelRatedInformation {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParallelRatedInformation {
    pub parallel_connection_status: ParallelConnectionStatus,
    pub serial_number_valid_length: u32,
    pub serial_number: String,
    pub charge_source_priority: ChargeSourcePriority,
    pub max_charge_current: u32,
    pub max_ac_charge_current: u32,
    pub output_mode: OutputMode,
}

impl ParallelRatedInformation {
    // Documented as 2 wide, 6kW units send 3 digits for the AC charge current.
    const LENGTHS: [FieldLength; 7] = [w(1), w(2), w(20), w(1), w(3), FieldLength::range(2, 3), w(1)];

    fn decode(data: &str) -> Result<Self> {
        let f = Fields::split("ParallelRatedInformation", data, &Self::LENGTHS, None)?;

        let serial_number_valid_length = f.u32(1)?;
        let serial_number = f
            .text(2)?
            .chars()
            .take(serial_number_valid_length as usize)
            .collect();

        Ok(Self {
            parallel_connection_status: f.enumeration(0)?,
            serial_number_valid_length,
            serial_number,
            charge_source_priority: f.enumeration(3)?,
            max_charge_current: f.u32(4)?,
            max_ac_charge_current: f.u32(5)?,
            output_mode: f.enumeration(6)?,
        })
    }
}

impl Record for ParallelRatedInformation {
    fn content(&self) -> Content {
        table(vec![
            Field::new("parallel_connection_status", "Parallel connection status", Value::label(self.parallel_connection_status)),
            Field::new("serial_number", "Serial number", self.serial_number.as_str()),
            Field::new("charge_source_priority", "Charge source priority", Value::label(self.charge_source_priority)),
            Field::new("max_charge_current", "Max charge current", self.max_charge_current).unit(Unit::A),
            Field::new("max_ac_charge_current", "Max AC charge current", self.max_ac_charge_current).unit(Unit::A),
            Field::new("output_mode", "Output mode", Value::label(self.output_mode)),
        ])
    }
} // }}}

// ParallelGeneralStatus {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParallelGeneralStatus {
    pub parallel_connection_status: ParallelConnectionStatus,
    pub work_mode: WorkingMode,
    pub fault_code: u32,
    pub grid_voltage: u32,
    pub grid_freq: u32,
    pub ac_output_voltage: u32,
    pub ac_output_freq: u32,
    pub ac_output_apparent_power: u32,
    pub ac_output_active_power: u32,
    pub total_ac_output_apparent_power: u32,
    pub total_ac_output_active_power: u32,
    pub output_load_percent: u32,
    pub total_output_load_percent: u32,
    pub battery_voltage: u32,
    pub battery_discharge_current: u32,
    pub battery_charge_current: u32,
    pub total_battery_charge_current: u32,
    pub battery_capacity: u32,
    pub pv1_input_power: u32,
    pub pv2_input_power: u32,
    pub pv1_input_voltage: u32,
    pub pv2_input_voltage: u32,
    pub mppt1_charger_status: MpptChargerStatus,
    pub mppt2_charger_status: MpptChargerStatus,
    pub load_connected: LoadConnectionStatus,
    pub battery_power_direction: BatteryPowerDirection,
    pub dc_ac_power_direction: DcAcPowerDirection,
    pub line_power_direction: LinePowerDirection,
    /// Missing on some hardware revisions.
    pub max_temp: Option<u32>,
}

impl ParallelGeneralStatus {
    const LENGTHS: [FieldLength; 29] = [
        w(1), w(1), w(2), w(4), w(3), w(4), w(3), w(4), w(4), w(5),
        w(5), w(3), w(3), w(3), w(3), w(3), w(3), w(3), w(4), w(4),
        w(4), w(4), w(1), w(1), w(1), w(1), w(1), w(1), w(3),
    ];

    fn decode(data: &str) -> Result<Self> {
        let f = Fields::split("ParallelGeneralStatus", data, &Self::LENGTHS, Some(28))?;

        let max_temp = if f.len() >= 29 { Some(f.u32(28)?) } else { None };

        Ok(Self {
            parallel_connection_status: f.enumeration(0)?,
            work_mode: f.enumeration(1)?,
            fault_code: f.u32(2)?,
            grid_voltage: f.u32(3)?,
            grid_freq: f.u32(4)?,
            ac_output_voltage: f.u32(5)?,
            ac_output_freq: f.u32(6)?,
            ac_output_apparent_power: f.u32(7)?,
            ac_output_active_power: f.u32(8)?,
            total_ac_output_apparent_power: f.u32(9)?,
            total_ac_output_active_power: f.u32(10)?,
            output_load_percent: f.u32(11)?,
            total_output_load_percent: f.u32(12)?,
            battery_voltage: f.u32(13)?,
            battery_discharge_current: f.u32(14)?,
            battery_charge_current: f.u32(15)?,
            total_battery_charge_current: f.u32(16)?,
            battery_capacity: f.u32(17)?,
            pv1_input_power: f.u32(18)?,
            pv2_input_power: f.u32(19)?,
            pv1_input_voltage: f.u32(20)?,
            pv2_input_voltage: f.u32(21)?,
            mppt1_charger_status: f.enumeration(22)?,
            mppt2_charger_status: f.enumeration(23)?,
            load_connected: f.enumeration(24)?,
            battery_power_direction: f.enumeration(25)?,
            dc_ac_power_direction: f.enumeration(26)?,
            line_power_direction: f.enumeration(27)?,
            max_temp,
        })
    }
}

impl Record for ParallelGeneralStatus {
    fn content(&self) -> Content {
        let mut fields = vec![
            Field::new("parallel_connection_status", "Parallel connection status", Value::label(self.parallel_connection_status)),
            Field::new("mode", "Working mode", Value::label(self.work_mode)),
            Field::new("fault_code", "Fault code", self.fault_code),
            Field::new("grid_voltage", "Grid voltage", Value::tenths(self.grid_voltage)).unit(Unit::V),
            Field::new("grid_freq", "Grid frequency", Value::tenths(self.grid_freq)).unit(Unit::Hz),
            Field::new("ac_output_voltage", "AC output voltage", Value::tenths(self.ac_output_voltage)).unit(Unit::V),
            Field::new("ac_output_freq", "AC output frequency", Value::tenths(self.ac_output_freq)).unit(Unit::Hz),
            Field::new("ac_output_apparent_power", "AC output apparent power", self.ac_output_apparent_power).unit(Unit::VA),
            Field::new("ac_output_active_power", "AC output active power", self.ac_output_active_power).unit(Unit::Wh),
            Field::new("total_ac_output_apparent_power", "Total AC output apparent power", self.total_ac_output_apparent_power).unit(Unit::VA),
            Field::new("total_ac_output_active_power", "Total AC output active power", self.total_ac_output_active_power).unit(Unit::Wh),
            Field::new("output_load_percent", "Output load percent", self.output_load_percent).unit(Unit::Percentage),
            Field::new("total_output_load_percent", "Total output load percent", self.total_output_load_percent).unit(Unit::Percentage),
            Field::new("battery_voltage", "Battery voltage", Value::tenths(self.battery_voltage)).unit(Unit::V),
            Field::new("battery_discharge_current", "Battery discharge current", self.battery_discharge_current).unit(Unit::A),
            Field::new("battery_charge_current", "Battery charge current", self.battery_charge_current).unit(Unit::A),
            Field::new("total_battery_charge_current", "Total battery charge current", self.total_battery_charge_current).unit(Unit::A),
            Field::new("battery_capacity", "Battery capacity", self.battery_capacity).unit(Unit::Percentage),
            Field::new("pv1_input_power", "PV1 input power", self.pv1_input_power).unit(Unit::Wh),
            Field::new("pv2_input_power", "PV2 input power", self.pv2_input_power).unit(Unit::Wh),
            Field::new("pv1_input_voltage", "PV1 input voltage", Value::tenths(self.pv1_input_voltage)).unit(Unit::V),
            Field::new("pv2_input_voltage", "PV2 input voltage", Value::tenths(self.pv2_input_voltage)).unit(Unit::V),
            Field::new("mppt1_charger_status", "MPPT1 charger status", Value::label(self.mppt1_charger_status)),
            Field::new("mppt2_charger_status", "MPPT2 charger status", Value::label(self.mppt2_charger_status)),
            Field::new("load_connected", "Load connection", Value::label(self.load_connected)),
            Field::new("battery_power_direction", "Battery power direction", Value::label(self.battery_power_direction)),
            Field::new("dc_ac_power_direction", "DC/AC power direction", Value::label(self.dc_ac_power_direction)),
            Field::new("line_power_direction", "Line power direction", Value::label(self.line_power_direction)),
        ];

        if let Some(max_temp) = self.max_temp {
            fields.push(Field::new("max_temp", "Max. temperature", max_temp));
        }

        table(fields)
    }
} // }}}

// TimeBucket {{{
/// Daily window for AC charging or AC supply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeBucket {
    pub start_hour: u32,
    pub start_minute: u32,
    pub end_hour: u32,
    pub end_minute: u32,
}

impl TimeBucket {
    const NAME: &'static str = "TimeBucket";

    fn decode(data: &str) -> Result<Self> {
        let f = Fields::split(Self::NAME, data, &[w(4), w(4)], None)?;
        let start = f.text(0)?;
        let end = f.text(1)?;
        let part = |s: &str, at| fields::number(Self::NAME, fields::fixed(Self::NAME, s, at, 2)?);

        Ok(Self {
            start_hour: part(start.as_str(), 0)?,
            start_minute: part(start.as_str(), 2)?,
            end_hour: part(end.as_str(), 0)?,
            end_minute: part(end.as_str(), 2)?,
        })
    }
}

impl Record for TimeBucket {
    fn content(&self) -> Content {
        table(vec![
            Field::new("start_time", "Start time", format!("{:02}:{:02}", self.start_hour, self.start_minute)),
            Field::new("end_time", "End time", format!("{:02}:{:02}", self.end_hour, self.end_minute)),
        ])
    }
} // }}}

// SetAck {{{
/// Acknowledgement of a set command: `^1` or `^0`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SetAck {
    ok: bool,
}

impl SetAck {
    fn decode(raw: &[u8]) -> Result<Self> {
        match raw {
            [b'^', b'1', ..] => Ok(Self { ok: true }),
            [b'^', b'0', ..] => Ok(Self { ok: false }),
            _ => Err(Error::InvalidResponse(
                "set response must be ^0 or ^1".to_string(),
            )),
        }
    }

    pub fn get(&self) -> bool {
        self.ok
    }
}

impl Record for SetAck {
    fn content(&self) -> Content {
        Content::Status {
            ok: self.ok,
            message: String::new(),
        }
    }
} // }}}

// ErrorResponse {{{
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
}

impl Record for ErrorResponse {
    fn content(&self) -> Content {
        Content::Status {
            ok: false,
            message: self.message.clone(),
        }
    }
} // }}}
