//! Command codes and service-bus topics
//!
//! Code points are stable wire constants; the textual names exist only for
//! non-RT layers (control surfaces, scripting, logs). The RT path operates
//! on the numeric codes exclusively.

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND CODES
// ═══════════════════════════════════════════════════════════════════════════════

/// Closed enumeration of RT command codes (used in `RtCommand.id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CmdId {
    /// Unknown/unparsable command; discarded on the RT side.
    Unknown = 0,
    Play = 1,
    Stop = 2,
    StopQuantized = 3,
    RecArm = 4,
    RecDisarm = 5,
    Overdub = 6,
    ParamSet = 7,
    Clear = 8,
    QuantizeMode = 9,
    Continue = 10,
    SetTempoBpm = 11,
    /// index = denominator, value = numerator
    SetTimeSig = 12,
    /// aux = start frame, value = end frame
    SetLoopRegion = 13,
    /// index = key, value = velocity
    NoteOn = 14,
    /// index = key
    NoteOff = 15,
    /// index = clip id
    ClipTrigger = 16,
}

impl CmdId {
    /// Decode a raw wire code; anything outside the closed set is `Unknown`.
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            1 => Self::Play,
            2 => Self::Stop,
            3 => Self::StopQuantized,
            4 => Self::RecArm,
            5 => Self::RecDisarm,
            6 => Self::Overdub,
            7 => Self::ParamSet,
            8 => Self::Clear,
            9 => Self::QuantizeMode,
            10 => Self::Continue,
            11 => Self::SetTempoBpm,
            12 => Self::SetTimeSig,
            13 => Self::SetLoopRegion,
            14 => Self::NoteOn,
            15 => Self::NoteOff,
            16 => Self::ClipTrigger,
            _ => Self::Unknown,
        }
    }

    /// Stable textual name (non-RT layers only).
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Play => "play",
            Self::Stop => "stop",
            Self::StopQuantized => "stop_quantized",
            Self::RecArm => "rec_arm",
            Self::RecDisarm => "rec_disarm",
            Self::Overdub => "overdub",
            Self::ParamSet => "param_set",
            Self::Clear => "clear",
            Self::QuantizeMode => "quantize",
            Self::Continue => "continue",
            Self::SetTempoBpm => "set_tempo_bpm",
            Self::SetTimeSig => "set_timesig",
            Self::SetLoopRegion => "set_loop_region",
            Self::NoteOn => "note_on",
            Self::NoteOff => "note_off",
            Self::ClipTrigger => "clip_trigger",
        }
    }

    /// Parse a textual command name. String comparison: never call on RT.
    pub fn parse(s: &str) -> Self {
        match s {
            "play" => Self::Play,
            "stop" => Self::Stop,
            "stop_quantized" => Self::StopQuantized,
            "rec_arm" => Self::RecArm,
            "rec_disarm" => Self::RecDisarm,
            "overdub" => Self::Overdub,
            "param_set" => Self::ParamSet,
            "clear" => Self::Clear,
            "quantize" => Self::QuantizeMode,
            "continue" => Self::Continue,
            "set_tempo_bpm" => Self::SetTempoBpm,
            "set_timesig" => Self::SetTimeSig,
            "set_loop_region" => Self::SetLoopRegion,
            "note_on" => Self::NoteOn,
            "note_off" => Self::NoteOff,
            "clip_trigger" => Self::ClipTrigger,
            _ => Self::Unknown,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE BUS TOPICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Topic identifiers for the service event bus (off-RT only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Topic {
    UiStatus = 1001,
    UiBanner = 1002,
    UiPage = 1003,
    MetersUpdate = 2001,
    PowerBatteryLow = 3001,
    ProjectSaveRequest = 4001,
    ProjectSaveDone = 4002,
    TelemetryRtAlert = 5001,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_parse_round_trip() {
        let all = [
            CmdId::Play,
            CmdId::Stop,
            CmdId::StopQuantized,
            CmdId::RecArm,
            CmdId::RecDisarm,
            CmdId::Overdub,
            CmdId::ParamSet,
            CmdId::Clear,
            CmdId::QuantizeMode,
            CmdId::Continue,
            CmdId::SetTempoBpm,
            CmdId::SetTimeSig,
            CmdId::SetLoopRegion,
            CmdId::NoteOn,
            CmdId::NoteOff,
            CmdId::ClipTrigger,
        ];
        for id in all {
            assert_eq!(CmdId::parse(id.name()), id);
            assert_eq!(CmdId::from_raw(id as u16), id);
        }
    }

    #[test]
    fn test_unknown_names_resolve_to_zero() {
        assert_eq!(CmdId::parse("warp_drive"), CmdId::Unknown);
        assert_eq!(CmdId::parse(""), CmdId::Unknown);
        assert_eq!(CmdId::Unknown as u16, 0);
    }

    #[test]
    fn test_raw_codes_outside_set() {
        assert_eq!(CmdId::from_raw(17), CmdId::Unknown);
        assert_eq!(CmdId::from_raw(u16::MAX), CmdId::Unknown);
    }

    #[test]
    fn test_topic_code_points() {
        assert_eq!(Topic::UiStatus as u32, 1001);
        assert_eq!(Topic::MetersUpdate as u32, 2001);
        assert_eq!(Topic::TelemetryRtAlert as u32, 5001);
    }
}
