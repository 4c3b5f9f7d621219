use crate::prelude::*;
use crate::p18::types::{self, AC_OUTPUT_VOLTAGES, RECHARGE_VOLTAGES, REDISCHARGE_VOLTAGES};

use chrono::NaiveDate;

/// Human command names, as typed on the command line or sent to the daemon.
pub const COMMANDS: [(&str, CommandKind); 41] = [
    ("get-protocol-id", CommandKind::GetProtocolId),
    ("get-date-time", CommandKind::GetCurrentTime),
    ("get-total-generated", CommandKind::GetTotalGenerated),
    ("get-year-generated", CommandKind::GetYearGenerated),
    ("get-month-generated", CommandKind::GetMonthGenerated),
    ("get-day-generated", CommandKind::GetDayGenerated),
    ("get-serial-number", CommandKind::GetSerialNumber),
    ("get-cpu-version", CommandKind::GetCpuVersion),
    ("get-rated", CommandKind::GetRatedInformation),
    ("get-status", CommandKind::GetGeneralStatus),
    ("get-mode", CommandKind::GetWorkingMode),
    ("get-errors", CommandKind::GetFaultsAndWarnings),
    ("get-flags", CommandKind::GetFlagsAndStatuses),
    ("get-rated-defaults", CommandKind::GetRatedDefaults),
    ("get-allowed-charge-currents", CommandKind::GetAllowedChargeCurrents),
    ("get-allowed-ac-charge-currents", CommandKind::GetAllowedAcChargeCurrents),
    ("get-p-rated", CommandKind::GetParallelRatedInformation),
    ("get-p-status", CommandKind::GetParallelGeneralStatus),
    ("get-ac-charge-time", CommandKind::GetAcChargeTimeBucket),
    ("get-ac-supply-time", CommandKind::GetAcSupplyTimeBucket),
    ("set-ac-supply", CommandKind::SetAcSupply),
    ("set-flag", CommandKind::SetFlag),
    ("set-rated-defaults", CommandKind::SetDefaults),
    ("set-max-charge-current", CommandKind::SetBatteryMaxChargeCurrent),
    ("set-max-ac-charge-current", CommandKind::SetBatteryMaxAcChargeCurrent),
    ("set-ac-output-freq", CommandKind::SetAcOutputFreq),
    ("set-max-charge-voltage", CommandKind::SetBatteryMaxChargeVoltage),
    ("set-ac-output-voltage", CommandKind::SetAcOutputVoltage),
    ("set-output-source-priority", CommandKind::SetOutputSourcePriority),
    ("set-charge-thresholds", CommandKind::SetBatteryChargeThresholds),
    ("set-charge-source-priority", CommandKind::SetChargeSourcePriority),
    ("set-solar-power-priority", CommandKind::SetSolarPowerPriority),
    ("set-ac-input-voltage-range", CommandKind::SetAcInputVoltageRange),
    ("set-battery-type", CommandKind::SetBatteryType),
    ("set-output-mode", CommandKind::SetOutputMode),
    ("set-battery-cutoff-voltage", CommandKind::SetBatteryCutOffVoltage),
    ("set-solar-configuration", CommandKind::SetSolarConfig),
    ("clear-generated-data", CommandKind::ClearGenerated),
    ("set-date-time", CommandKind::SetDateTime),
    ("set-ac-charge-time", CommandKind::SetAcChargeTimeBucket),
    ("set-ac-supply-time", CommandKind::SetAcSupplyTimeBucket),
];

pub fn lookup(name: &str) -> Option<CommandKind> {
    COMMANDS
        .iter()
        .find(|(command, _)| *command == name)
        .map(|(_, kind)| *kind)
}

pub fn name_of(kind: CommandKind) -> &'static str {
    COMMANDS
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(command, _)| *command)
        .unwrap_or("unknown")
}

/// How many arguments the user supplies for `kind`.
pub fn argument_count(kind: CommandKind) -> usize {
    use CommandKind::*;

    match kind {
        GetYearGenerated | GetParallelRatedInformation | GetParallelGeneralStatus | SetAcSupply
        | SetAcOutputFreq | SetAcOutputVoltage | SetOutputSourcePriority
        | SetSolarPowerPriority | SetAcInputVoltageRange | SetBatteryType
        | SetBatteryCutOffVoltage | SetSolarConfig => 1,

        GetMonthGenerated | SetFlag | SetBatteryMaxChargeCurrent | SetBatteryMaxAcChargeCurrent
        | SetBatteryMaxChargeVoltage | SetBatteryChargeThresholds | SetChargeSourcePriority
        | SetOutputMode | SetAcChargeTimeBucket | SetAcSupplyTimeBucket => 2,

        GetDayGenerated => 3,
        SetDateTime => 6,

        _ => 0,
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidArgument(message.to_string())
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_u32(s: &str, message: &str) -> Result<u32> {
    if !is_numeric(s) {
        return Err(invalid(message));
    }
    s.parse().map_err(|_| invalid(message))
}

fn parse_decimal(s: &str, message: &str) -> Result<f64> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(message))
}

/// Ordinal of `token` in `choices`, as a string.
fn choose(token: &str, choices: &[&str], message: &str) -> Result<String> {
    choices
        .iter()
        .position(|choice| *choice == token)
        .map(|index| index.to_string())
        .ok_or_else(|| invalid(message))
}

fn parallel_id(s: &str) -> Result<String> {
    let id = parse_u32(s, "invalid id")?;
    if !types::is_valid_parallel_id(id) {
        return Err(invalid("invalid id"));
    }
    Ok(id.to_string())
}

fn check_date(year: &str, month: Option<&str>, day: Option<&str>) -> Result<()> {
    if !is_numeric(year) || year.len() != 4 {
        return Err(invalid("invalid year"));
    }
    let y = parse_u32(year, "invalid year")?;
    if !(2000..=2099).contains(&y) {
        return Err(invalid("invalid year"));
    }

    let m = match month {
        Some(month) => {
            let m = if month.len() > 2 { None } else { month.parse::<u32>().ok() };
            match m {
                Some(m) if is_numeric(month) && (1..=12).contains(&m) => Some(m),
                _ => return Err(invalid("invalid month")),
            }
        }
        None => None,
    };

    let d = match day {
        Some(day) => {
            let d = if day.len() > 2 { None } else { day.parse::<u32>().ok() };
            match d {
                Some(d) if is_numeric(day) && (1..=31).contains(&d) => Some(d),
                _ => return Err(invalid("invalid day")),
            }
        }
        None => None,
    };

    if let (Some(m), Some(d)) = (m, d) {
        if NaiveDate::from_ymd_opt(y as i32, m, d).is_none() {
            return Err(invalid("invalid date"));
        }
    }

    Ok(())
}

fn check_clock_part(s: &str, max: u32, message: &str) -> Result<()> {
    if s.len() > 2 || parse_u32(s, message)? > max {
        return Err(invalid(message));
    }
    Ok(())
}

/// "HH:MM" into (hour, minute).
fn clock(s: &str, message: &str) -> Result<(u32, u32)> {
    let (hour, minute) = s.split_once(':').ok_or_else(|| invalid(message))?;
    if minute.contains(':') {
        return Err(invalid(message));
    }

    let hour = parse_u32(hour, message)?;
    let minute = parse_u32(minute, message)?;
    if hour > 23 || minute > 59 {
        return Err(invalid(message));
    }

    Ok((hour, minute))
}

fn tenths_in(value: f64, tables: &[&[u32]]) -> bool {
    let tenths = (value * 10.0).round();
    if (tenths / 10.0 - value).abs() > 1e-6 || tenths < 0.0 {
        return false;
    }
    tables.iter().any(|table| table.contains(&(tenths as u32)))
}

/// Resolves a command name and checks its arguments.
///
/// Returns the command kind together with the arguments in the form
/// [`CommandKind::pack`] expects: choice tokens become ordinals, flag names
/// become letters and time ranges become four numbers. The device is never
/// touched here.
pub fn validate(name: &str, args: &[String]) -> Result<(CommandKind, Vec<String>)> {
    use CommandKind::*;

    let kind = lookup(name).ok_or_else(|| invalid("invalid command"))?;

    let required = argument_count(kind);
    if args.len() != required {
        return Err(Error::InvalidArgument(format!(
            "this command requires {} argument{}",
            required,
            if required == 1 { "" } else { "s" }
        )));
    }

    let mut args = args.to_vec();

    match kind {
        GetYearGenerated => check_date(&args[0], None, None)?,
        GetMonthGenerated => check_date(&args[0], Some(&args[1]), None)?,
        GetDayGenerated => check_date(&args[0], Some(&args[1]), Some(&args[2]))?,

        GetParallelRatedInformation | GetParallelGeneralStatus => {
            if !is_numeric(&args[0]) || args[0].len() > 1 {
                return Err(invalid("invalid argument"));
            }
        }

        SetAcSupply => {
            if args[0] != "0" && args[0] != "1" {
                return Err(invalid("invalid argument, only 0 or 1 allowed"));
            }
        }

        SetFlag => {
            let flag = types::find_flag(&args[0]).ok_or_else(|| invalid("invalid flag"))?;
            if args[1] != "0" && args[1] != "1" {
                return Err(invalid("invalid flag state, only 0 or 1 allowed"));
            }
            args[0] = flag.letter.to_string();
        }

        SetBatteryMaxChargeCurrent | SetBatteryMaxAcChargeCurrent => {
            args[0] = parallel_id(&args[0])?;
            let amps = parse_u32(&args[1], "invalid amps")?;
            if amps > 999 {
                return Err(invalid("invalid amps"));
            }
            args[1] = amps.to_string();
        }

        SetAcOutputFreq => {
            if args[0] != "50" && args[0] != "60" {
                return Err(invalid("invalid frequency, only 50 or 60 allowed"));
            }
        }

        SetBatteryMaxChargeVoltage => {
            let cv = parse_decimal(&args[0], "invalid CV")?;
            let fv = parse_decimal(&args[1], "invalid FV")?;
            if !(48.0..=58.4).contains(&cv) {
                return Err(invalid("invalid CV"));
            }
            if !(48.0..=58.4).contains(&fv) {
                return Err(invalid("invalid FV"));
            }
        }

        SetAcOutputVoltage => {
            let v = parse_u32(&args[0], "invalid voltage")?;
            if !AC_OUTPUT_VOLTAGES.contains(&v) {
                return Err(invalid("invalid voltage"));
            }
            args[0] = v.to_string();
        }

        SetOutputSourcePriority => {
            args[0] = choose(&args[0], &["SUB", "SBU"], "invalid argument")?;
        }

        SetBatteryChargeThresholds => {
            let cv = parse_decimal(&args[0], "invalid CV")?;
            let dv = parse_decimal(&args[1], "invalid DV")?;
            if !tenths_in(cv, &RECHARGE_VOLTAGES) {
                return Err(invalid("invalid CV"));
            }
            if !tenths_in(dv, &REDISCHARGE_VOLTAGES) {
                return Err(invalid("invalid DV"));
            }
        }

        SetChargeSourcePriority => {
            args[0] = parallel_id(&args[0])?;
            args[1] = choose(&args[1], &["SF", "SU", "S"], "invalid argument")?;
        }

        SetSolarPowerPriority => {
            args[0] = choose(&args[0], &["BLU", "LBU"], "invalid priority")?;
        }

        SetAcInputVoltageRange => {
            args[0] = choose(&args[0], &["APPLIANCE", "UPS"], "invalid argument")?;
        }

        SetBatteryType => {
            args[0] = choose(&args[0], &["AGM", "FLOODED", "USER"], "invalid type")?;
        }

        SetOutputMode => {
            args[0] = parallel_id(&args[0])?;
            args[1] = choose(&args[1], &["S", "P", "1", "2", "3"], "invalid model")?;
        }

        SetBatteryCutOffVoltage => {
            let v = parse_decimal(&args[0], "invalid voltage")?;
            if !(40.0..=48.0).contains(&v) {
                return Err(invalid("invalid voltage"));
            }
        }

        SetSolarConfig => {
            if !is_numeric(&args[0]) || args[0].len() > 20 {
                return Err(invalid("invalid argument"));
            }
        }

        SetDateTime => {
            check_date(&args[0], Some(&args[1]), Some(&args[2]))?;
            check_clock_part(&args[3], 23, "invalid hour")?;
            check_clock_part(&args[4], 59, "invalid minute")?;
            check_clock_part(&args[5], 59, "invalid second")?;
        }

        SetAcChargeTimeBucket | SetAcSupplyTimeBucket => {
            let (start_hour, start_minute) = clock(&args[0], "invalid start time")?;
            let (end_hour, end_minute) = clock(&args[1], "invalid end time")?;
            args = vec![
                start_hour.to_string(),
                start_minute.to_string(),
                end_hour.to_string(),
                end_minute.to_string(),
            ];
        }

        _ => {}
    }

    Ok((kind, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, args: &[&str]) -> Result<(CommandKind, Vec<String>)> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        validate(name, &args)
    }

    fn message(name: &str, args: &[&str]) -> String {
        run(name, args).unwrap_err().to_string()
    }

    #[test]
    fn every_kind_has_a_name() {
        for kind in CommandKind::ALL {
            assert_eq!(lookup(name_of(kind)), Some(kind));
        }
    }

    #[test]
    fn unknown_command() {
        assert_eq!(message("get-everything", &[]), "invalid command");
    }

    #[test]
    fn exact_argument_count() {
        assert_eq!(message("get-year-generated", &[]), "this command requires 1 argument");
        assert_eq!(
            message("get-day-generated", &["2024", "1"]),
            "this command requires 3 arguments"
        );
        assert_eq!(message("get-status", &["1"]), "this command requires 0 arguments");
    }

    #[test]
    fn calendar_rules() {
        assert!(run("get-day-generated", &["2024", "2", "29"]).is_ok());
        assert_eq!(message("get-day-generated", &["2023", "2", "29"]), "invalid date");
        assert_eq!(message("get-day-generated", &["2024", "4", "31"]), "invalid date");
        assert_eq!(message("get-month-generated", &["2024", "13"]), "invalid month");
        assert_eq!(message("get-month-generated", &["2024", "0"]), "invalid month");
        assert_eq!(message("get-year-generated", &["1999"]), "invalid year");
        assert_eq!(message("get-year-generated", &["24"]), "invalid year");
        assert_eq!(message("get-day-generated", &["2024", "1", "32"]), "invalid day");
    }

    #[test]
    fn date_time() {
        assert!(run("set-date-time", &["2024", "10", "19", "23", "59", "59"]).is_ok());
        assert_eq!(
            message("set-date-time", &["2024", "10", "19", "24", "0", "0"]),
            "invalid hour"
        );
        assert_eq!(
            message("set-date-time", &["2024", "10", "19", "1", "60", "0"]),
            "invalid minute"
        );
        assert_eq!(
            message("set-date-time", &["2024", "10", "19", "1", "0", "x"]),
            "invalid second"
        );
    }

    #[test]
    fn choices_become_ordinals() {
        assert_eq!(
            run("set-output-source-priority", &["SBU"]).unwrap(),
            (CommandKind::SetOutputSourcePriority, vec!["1".to_string()])
        );
        assert_eq!(
            run("set-battery-type", &["USER"]).unwrap().1,
            vec!["2".to_string()]
        );
        assert_eq!(
            run("set-output-mode", &["0", "3"]).unwrap().1,
            vec!["0".to_string(), "4".to_string()]
        );
        assert_eq!(message("set-battery-type", &["LIFEPO4"]), "invalid type");
        assert_eq!(message("set-solar-power-priority", &["X"]), "invalid priority");
        assert_eq!(message("set-output-mode", &["0", "T"]), "invalid model");
    }

    #[test]
    fn flags_become_letters() {
        assert_eq!(
            run("set-flag", &["BLON", "1"]).unwrap().1,
            vec!["F".to_string(), "1".to_string()]
        );
        assert_eq!(message("set-flag", &["NOPE", "1"]), "invalid flag");
        assert_eq!(
            message("set-flag", &["BUZZ", "2"]),
            "invalid flag state, only 0 or 1 allowed"
        );
    }

    #[test]
    fn numeric_ranges() {
        assert!(run("set-max-charge-voltage", &["48", "58.4"]).is_ok());
        assert_eq!(message("set-max-charge-voltage", &["58.5", "50"]), "invalid CV");
        assert_eq!(message("set-max-charge-voltage", &["50", "47.9"]), "invalid FV");
        assert_eq!(message("set-max-charge-voltage", &["NaN", "50"]), "invalid CV");
        assert_eq!(message("set-max-charge-current", &["7", "10"]), "invalid id");
        assert_eq!(message("set-max-charge-current", &["0", "1000"]), "invalid amps");
        assert_eq!(message("set-ac-output-voltage", &["210"]), "invalid voltage");
        assert_eq!(message("set-battery-cutoff-voltage", &["39.9"]), "invalid voltage");
        assert_eq!(
            message("set-ac-output-freq", &["55"]),
            "invalid frequency, only 50 or 60 allowed"
        );
        assert_eq!(
            message("set-ac-supply", &["2"]),
            "invalid argument, only 0 or 1 allowed"
        );
        assert_eq!(message("get-p-status", &["12"]), "invalid argument");
        assert_eq!(message("set-solar-configuration", &["12ab"]), "invalid argument");
    }

    #[test]
    fn charge_thresholds_use_tables() {
        assert!(run("set-charge-thresholds", &["11.3", "0"]).is_ok());
        assert!(run("set-charge-thresholds", &["49", "58"]).is_ok());
        assert_eq!(message("set-charge-thresholds", &["11.4", "0"]), "invalid CV");
        assert_eq!(message("set-charge-thresholds", &["48", "47"]), "invalid DV");
    }

    #[test]
    fn time_ranges_expand() {
        assert_eq!(
            run("set-ac-charge-time", &["01:30", "23:00"]).unwrap().1,
            vec!["1", "30", "23", "0"]
        );
        assert_eq!(
            message("set-ac-supply-time", &["24:00", "23:00"]),
            "invalid start time"
        );
        assert_eq!(message("set-ac-supply-time", &["00:00", "2300"]), "invalid end time");
    }
}
