use crate::prelude::*;
use crate::transport::crc;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Every operation the protocol supports. Ids from 100 up are setters,
/// which go out as `^S` frames; the rest are getters (`^P`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum CommandKind {
    GetProtocolId = 0,
    GetCurrentTime,
    GetTotalGenerated,
    GetYearGenerated,
    GetMonthGenerated,
    GetDayGenerated,
    GetSerialNumber,
    GetCpuVersion,
    GetRatedInformation,
    GetGeneralStatus,
    GetWorkingMode,
    GetFaultsAndWarnings,
    GetFlagsAndStatuses,
    GetRatedDefaults,
    GetAllowedChargeCurrents,
    GetAllowedAcChargeCurrents,
    GetParallelRatedInformation,
    GetParallelGeneralStatus,
    GetAcChargeTimeBucket,
    GetAcSupplyTimeBucket,
    SetAcSupply = 100,
    SetFlag,
    SetDefaults,
    SetBatteryMaxChargeCurrent,
    SetBatteryMaxAcChargeCurrent,
    SetAcOutputFreq,
    SetBatteryMaxChargeVoltage,
    SetAcOutputVoltage,
    SetOutputSourcePriority,
    SetBatteryChargeThresholds,
    SetChargeSourcePriority,
    SetSolarPowerPriority,
    SetAcInputVoltageRange,
    SetBatteryType,
    SetOutputMode,
    SetBatteryCutOffVoltage,
    SetSolarConfig,
    ClearGenerated,
    SetDateTime,
    SetAcChargeTimeBucket,
    SetAcSupplyTimeBucket,
}

impl CommandKind {
    pub const ALL: [CommandKind; 41] = [
        Self::GetProtocolId,
        Self::GetCurrentTime,
        Self::GetTotalGenerated,
        Self::GetYearGenerated,
        Self::GetMonthGenerated,
        Self::GetDayGenerated,
        Self::GetSerialNumber,
        Self::GetCpuVersion,
        Self::GetRatedInformation,
        Self::GetGeneralStatus,
        Self::GetWorkingMode,
        Self::GetFaultsAndWarnings,
        Self::GetFlagsAndStatuses,
        Self::GetRatedDefaults,
        Self::GetAllowedChargeCurrents,
        Self::GetAllowedAcChargeCurrents,
        Self::GetParallelRatedInformation,
        Self::GetParallelGeneralStatus,
        Self::GetAcChargeTimeBucket,
        Self::GetAcSupplyTimeBucket,
        Self::SetAcSupply,
        Self::SetFlag,
        Self::SetDefaults,
        Self::SetBatteryMaxChargeCurrent,
        Self::SetBatteryMaxAcChargeCurrent,
        Self::SetAcOutputFreq,
        Self::SetBatteryMaxChargeVoltage,
        Self::SetAcOutputVoltage,
        Self::SetOutputSourcePriority,
        Self::SetBatteryChargeThresholds,
        Self::SetChargeSourcePriority,
        Self::SetSolarPowerPriority,
        Self::SetAcInputVoltageRange,
        Self::SetBatteryType,
        Self::SetOutputMode,
        Self::SetBatteryCutOffVoltage,
        Self::SetSolarConfig,
        Self::ClearGenerated,
        Self::SetDateTime,
        Self::SetAcChargeTimeBucket,
        Self::SetAcSupplyTimeBucket,
    ];

    pub fn id(self) -> u16 {
        self.into()
    }

    pub fn is_set(self) -> bool {
        self.id() >= 100
    }

    pub fn mnemonic(self) -> &'static str {
        use CommandKind::*;

        match self {
            GetProtocolId => "PI",
            GetCurrentTime => "T",
            GetTotalGenerated => "ET",
            GetYearGenerated => "EY",
            GetMonthGenerated => "EM",
            GetDayGenerated => "ED",
            GetSerialNumber => "ID",
            GetCpuVersion => "VFW",
            GetRatedInformation => "PIRI",
            GetGeneralStatus => "GS",
            GetWorkingMode => "MOD",
            GetFaultsAndWarnings => "FWS",
            GetFlagsAndStatuses => "FLAG",
            GetRatedDefaults => "DI",
            GetAllowedChargeCurrents => "MCHGCR",
            GetAllowedAcChargeCurrents => "MUCHGCR",
            GetParallelRatedInformation => "PRI",
            GetParallelGeneralStatus => "PGS",
            GetAcChargeTimeBucket => "ACCT",
            GetAcSupplyTimeBucket => "ACLT",
            SetAcSupply => "LON",
            SetFlag => "P",
            SetDefaults => "PF",
            SetBatteryMaxChargeCurrent => "MCHGC",
            SetBatteryMaxAcChargeCurrent => "MUCHGC",
            // F50 and F60 in the vendor docs, one command with an argument here
            SetAcOutputFreq => "F",
            SetBatteryMaxChargeVoltage => "MCHGV",
            SetAcOutputVoltage => "V",
            SetOutputSourcePriority => "POP",
            SetBatteryChargeThresholds => "BUCD",
            SetChargeSourcePriority => "PCP",
            SetSolarPowerPriority => "PSP",
            SetAcInputVoltageRange => "PGR",
            SetBatteryType => "PBT",
            SetOutputMode => "POPM",
            SetBatteryCutOffVoltage => "PSDV",
            SetSolarConfig => "ID",
            ClearGenerated => "CLE",
            SetDateTime => "DAT",
            SetAcChargeTimeBucket => "ACCT",
            SetAcSupplyTimeBucket => "ACLT",
        }
    }

    /// Renders already validated arguments in this command's wire layout.
    ///
    /// Arguments are expected in the shape the registry produces; anything
    /// else is reported as `Error::Internal`.
    pub fn pack(self, args: &[String]) -> Result<String> {
        use CommandKind::*;

        let packer = Packer { kind: self, args };

        let packed = match self {
            GetYearGenerated | SetOutputSourcePriority | SetSolarPowerPriority
            | SetAcInputVoltageRange | SetBatteryType | SetAcSupply => packer.arg(0)?.to_string(),

            GetMonthGenerated => format!("{}{:02}", packer.arg(0)?, packer.int(1)?),

            GetDayGenerated => {
                format!("{}{:02}{:02}", packer.arg(0)?, packer.int(1)?, packer.int(2)?)
            }

            GetParallelGeneralStatus | GetParallelRatedInformation => packer.int(0)?.to_string(),

            SetFlag => {
                let state = if packer.arg(1)? == "1" { "E" } else { "D" };
                format!("{}{}", state, packer.arg(0)?)
            }

            SetBatteryMaxChargeCurrent | SetBatteryMaxAcChargeCurrent => {
                format!("{},{:03}", packer.arg(0)?, packer.int(1)?)
            }

            SetAcOutputFreq => format!("{:02}", packer.int(0)?),

            SetBatteryMaxChargeVoltage | SetBatteryChargeThresholds => {
                format!("{:03},{:03}", packer.tenths(0)?, packer.tenths(1)?)
            }

            SetAcOutputVoltage => format!("{:04}", packer.int(0)?.saturating_mul(10)),

            SetChargeSourcePriority | SetOutputMode => {
                format!("{},{}", packer.arg(0)?, packer.arg(1)?)
            }

            SetBatteryCutOffVoltage => format!("{:03}", packer.tenths(0)?),

            SetSolarConfig => {
                let serial = packer.arg(0)?;
                format!("{:02}{:0<20}", serial.len(), serial)
            }

            SetDateTime => {
                let year = packer.int(0)?.checked_sub(2000).ok_or_else(|| {
                    Error::Internal(format!("{:?}: year before 2000", self))
                })?;
                let mut packed = format!("{:02}", year);
                for i in 1..6 {
                    packed.push_str(&format!("{:02}", packer.int(i)?));
                }
                packed
            }

            SetAcChargeTimeBucket | SetAcSupplyTimeBucket => format!(
                "{:02}{:02},{:02}{:02}",
                packer.int(0)?,
                packer.int(1)?,
                packer.int(2)?,
                packer.int(3)?
            ),

            _ => String::new(),
        };

        Ok(packed)
    }

    /// Complete request without checksum and terminator, which the
    /// transport adds. The length field always reserves room for the
    /// checksum.
    pub fn frame(self, args: &[String]) -> Result<String> {
        let mnemonic = self.mnemonic();
        let packed = self.pack(args)?;
        let len = crc::SIZE + 1 + mnemonic.len() + packed.len();

        Ok(format!(
            "^{}{:03}{}{}",
            if self.is_set() { 'S' } else { 'P' },
            len,
            mnemonic,
            packed
        ))
    }
}

struct Packer<'a> {
    kind: CommandKind,
    args: &'a [String],
}

impl<'a> Packer<'a> {
    fn arg(&self, index: usize) -> Result<&'a str> {
        self.args.get(index).map(String::as_str).ok_or_else(|| {
            Error::Internal(format!("{:?}: argument {} is missing", self.kind, index))
        })
    }

    fn int(&self, index: usize) -> Result<u32> {
        let arg = self.arg(index)?;
        arg.parse().map_err(|_| {
            Error::Internal(format!("{:?}: argument {} is not an integer: {:?}", self.kind, index, arg))
        })
    }

    /// One-decimal fixed point, e.g. "56.4" -> 564.
    fn tenths(&self, index: usize) -> Result<u32> {
        let arg = self.arg(index)?;
        arg.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| (v * 10.0).round() as u32)
            .ok_or_else(|| {
                Error::Internal(format!("{:?}: argument {} is not a decimal: {:?}", self.kind, index, arg))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn set_partition() {
        assert!(!CommandKind::GetAcSupplyTimeBucket.is_set());
        assert!(CommandKind::SetAcSupply.is_set());
        assert_eq!(CommandKind::try_from(105).unwrap(), CommandKind::SetAcOutputFreq);
        assert!(CommandKind::try_from(20).is_err());
    }

    #[test]
    fn packing() {
        use CommandKind::*;

        let cases: &[(CommandKind, &[&str], &str)] = &[
            (GetMonthGenerated, &["2024", "3"], "202403"),
            (GetDayGenerated, &["2024", "3", "7"], "20240307"),
            (GetParallelGeneralStatus, &["1"], "1"),
            (SetFlag, &["F", "1"], "EF"),
            (SetFlag, &["A", "0"], "DA"),
            (SetBatteryMaxChargeCurrent, &["0", "60"], "0,060"),
            (SetAcOutputFreq, &["50"], "50"),
            (SetBatteryMaxChargeVoltage, &["56.4", "54"], "564,540"),
            (SetAcOutputVoltage, &["230"], "2300"),
            (SetChargeSourcePriority, &["0", "2"], "0,2"),
            (SetBatteryCutOffVoltage, &["42.5"], "425"),
            (SetSolarConfig, &["1234"], "0412340000000000000000"),
            (SetDateTime, &["2024", "10", "19", "8", "5", "0"], "241019080500"),
            (SetAcChargeTimeBucket, &["1", "30", "23", "0"], "0130,2300"),
            (ClearGenerated, &[], ""),
        ];

        for (kind, input, expected) in cases {
            assert_eq!(kind.pack(&args(input)).unwrap(), *expected, "{:?}", kind);
        }
    }

    #[test]
    fn frame_layout() {
        assert_eq!(
            CommandKind::SetAcOutputFreq.frame(&args(&["50"])).unwrap(),
            "^S006F50"
        );
        assert_eq!(CommandKind::GetProtocolId.frame(&[]).unwrap(), "^P005PI");
    }

    #[test]
    fn malformed_arguments_are_internal() {
        assert!(matches!(
            CommandKind::SetAcOutputFreq.pack(&[]),
            Err(Error::Internal(_))
        ));
        assert!(matches!(
            CommandKind::SetAcOutputVoltage.pack(&args(&["abc"])),
            Err(Error::Internal(_))
        ));
    }
}
