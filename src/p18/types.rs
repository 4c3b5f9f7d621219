use num_enum::{IntoPrimitive, TryFromPrimitive};

/// An enumerated response field: a wire ordinal with a display label.
pub trait Labeled: Copy + Into<u8> {
    fn label(self) -> &'static str;

    fn ordinal(self) -> u8 {
        self.into()
    }
}

macro_rules! labeled_enum {
    ($name:ident { $($variant:ident = $value:literal => $label:literal,)+ }) => {
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $value,)+
        }

        impl Labeled for $name {
            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }
    };
}

labeled_enum!(BatteryType {
    Agm = 0 => "AGM",
    Flooded = 1 => "Flooded",
    User = 2 => "User",
});

labeled_enum!(InputVoltageRange {
    Appliance = 0 => "Appliance",
    Ups = 1 => "USP",
});

labeled_enum!(OutputSourcePriority {
    SolarUtilityBattery = 0 => "Solar-Utility-Battery",
    SolarBatteryUtility = 1 => "Solar-Battery-Utility",
});

labeled_enum!(ChargeSourcePriority {
    SolarFirst = 0 => "Solar-First",
    SolarAndUtility = 1 => "Solar-and-Utility",
    SolarOnly = 2 => "Solar-only",
});

labeled_enum!(MachineType {
    OffGridTie = 0 => "Off-Grid-Tie",
    GridTie = 1 => "Grid-Tie",
});

labeled_enum!(Topology {
    TransformerLess = 0 => "Transformer-less",
    Transformer = 1 => "Transformer",
});

labeled_enum!(OutputMode {
    SingleOutput = 0 => "Single output",
    ParallelOutput = 1 => "Parallel output",
    Phase1Of3 = 2 => "Phase 1 of 3-phase output",
    Phase2Of3 = 3 => "Phase 2 of 3-phase output",
    Phase3Of3 = 4 => "Phase 3 of 3-phase",
});

labeled_enum!(SolarPowerPriority {
    BatteryLoadUtility = 0 => "Battery-Load-Utility",
    LoadBatteryUtility = 1 => "Load-Battery-Utility",
});

labeled_enum!(MpptChargerStatus {
    Abnormal = 0 => "Abnormal",
    NotCharging = 1 => "Not charging",
    Charging = 2 => "Charging",
});

labeled_enum!(BatteryPowerDirection {
    DoNothing = 0 => "Do nothing",
    Charge = 1 => "Charge",
    Discharge = 2 => "Discharge",
});

labeled_enum!(DcAcPowerDirection {
    DoNothing = 0 => "Do nothing",
    AcDc = 1 => "AC/DC",
    DcAc = 2 => "DC/AC",
});

labeled_enum!(LinePowerDirection {
    DoNothing = 0 => "Do nothing",
    Input = 1 => "Input",
    Output = 2 => "Output",
});

labeled_enum!(WorkingMode {
    PowerOn = 0 => "Power on mode",
    Standby = 1 => "Standby mode",
    Bypass = 2 => "Bypass mode",
    Battery = 3 => "Battery mode",
    Fault = 4 => "Fault mode",
    Hybrid = 5 => "Hybrid mode",
});

labeled_enum!(ParallelConnectionStatus {
    NotExistent = 0 => "Non-existent",
    Existent = 1 => "Existent",
});

labeled_enum!(LoadConnectionStatus {
    Disconnected = 0 => "Disconnected",
    Connected = 1 => "Connected",
});

labeled_enum!(ConfigurationStatus {
    Default = 0 => "Default",
    Changed = 1 => "Changed",
});

/// A setting toggled with `set-flag`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Flag {
    pub name: &'static str,
    pub letter: char,
    pub description: &'static str,
}

pub const FLAGS: [Flag; 9] = [
    Flag { name: "BUZZ", letter: 'A', description: "Silence buzzer or open buzzer" },
    Flag { name: "OLBP", letter: 'B', description: "Overload bypass function" },
    Flag { name: "LCDE", letter: 'C', description: "LCD display escape to default page after 1min timeout" },
    Flag { name: "OLRS", letter: 'D', description: "Overload restart" },
    Flag { name: "OTRS", letter: 'E', description: "Overload temperature restart" },
    Flag { name: "BLON", letter: 'F', description: "Backlight on" },
    Flag { name: "ALRM", letter: 'G', description: "Alarm on primary source interrupt" },
    Flag { name: "FTCR", letter: 'H', description: "Fault code record" },
    Flag { name: "MTYP", letter: 'I', description: "Machine type (1=Grid-Tie, 0=Off-Grid-Tie)" },
];

pub fn find_flag(name: &str) -> Option<&'static Flag> {
    FLAGS.iter().find(|flag| flag.name == name)
}

pub const AC_OUTPUT_VOLTAGES: [u32; 5] = [202, 208, 220, 230, 240];

// Voltages below are in tenths of a volt.
pub const RECHARGE_VOLTAGES: [&[u32]; 3] = [
    &[110, 113, 115, 118, 120, 123, 125, 128],
    &[220, 225, 230, 235, 240, 245, 250, 255],
    &[440, 450, 460, 470, 480, 490, 500, 510],
];

pub const REDISCHARGE_VOLTAGES: [&[u32]; 3] = [
    &[0, 120, 123, 125, 128, 130, 133, 135, 138, 140, 143, 145],
    &[0, 240, 245, 250, 255, 260, 265, 270, 275, 280, 285, 290],
    &[0, 480, 490, 500, 510, 520, 530, 540, 550, 560, 570, 580],
];

pub fn is_valid_parallel_id(id: u32) -> bool {
    id <= 6
}

pub struct FaultCodeString;
impl FaultCodeString {
    pub fn from_value(code: u32) -> Option<&'static str> {
        let s = match code {
            1 => "Fan is locked",
            2 => "Over temperature",
            3 => "Battery voltage is too high",
            4 => "Battery voltage is too low",
            5 => "Output short circuited or Over temperature",
            6 => "Output voltage is too high",
            7 => "Over load time out",
            8 => "Bus voltage is too high",
            9 => "Bus soft start failed",
            11 => "Main relay failed",
            51 => "Over current inverter",
            52 => "Bus soft start failed",
            53 => "Inverter soft start failed",
            54 => "Self-test failed",
            55 => "Over DC voltage on output of inverter",
            56 => "Battery connection is open",
            57 => "Current sensor failed",
            58 => "Output voltage is too low",
            60 => "Inverter negative power",
            71 => "Parallel version different",
            72 => "Output circuit failed",
            80 => "CAN communication failed",
            81 => "Parallel host line lost",
            82 => "Parallel synchronized signal lost",
            83 => "Parallel battery voltage detect different",
            84 => "Parallel LINE voltage or frequency detect different",
            85 => "Parallel LINE input current unbalanced",
            86 => "Parallel output setting different",

            _ => return None,
        };

        Some(s)
    }
}
