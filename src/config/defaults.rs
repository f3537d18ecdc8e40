//! Built-in defaults, used when neither the module nor the global layer
//! carries a value.

pub const POLAR_REFRESH: i64 = 3;
/// NESW
pub const POLAR_ORIENTATION: i64 = 0;
pub const POLAR_SAT_COLOUR: u32 = 0x8F00_00FF;
pub const POLAR_SAT_SEL_COLOUR: u32 = 0xFF0D_0BFF;
pub const POLAR_TRACK_COLOUR: u32 = 0x0000_FFFF;
pub const POLAR_INFO_COLOUR: u32 = 0x0000_7FFF;
pub const POLAR_AXIS_COLOUR: u32 = 0x0F0F_0F7F;
pub const POLAR_TICK_COLOUR: u32 = 0x007F_00FF;
pub const POLAR_NEXT_EVENT: bool = true;
pub const POLAR_SHOW_TRACK: bool = false;
pub const POLAR_CURSOR_TRACK: bool = true;
pub const POLAR_QTH_INFO: bool = true;

pub const MAP_REFRESH: i64 = 10;
pub const MAP_CENTER: i64 = 0;
pub const MAP_SAT_COLOUR: u32 = 0xF0F0_00FF;
pub const MAP_SAT_SEL_COLOUR: u32 = 0xFFFF_FFFF;
pub const MAP_COV_AREA_COLOUR: u32 = 0xFFFF_FF1F;
pub const MAP_TRACK_COLOUR: u32 = 0xFF12_00BB;
pub const MAP_INFO_COLOUR: u32 = 0x00FF_00FF;
pub const MAP_TRACK_NUMBER: i64 = 3;
pub const MAP_SHADOW_ALPHA: i64 = 0xDD;
pub const MAP_KEEP_RATIO: bool = false;
pub const MAP_NEXT_EVENT: bool = true;
pub const MAP_CURSOR_TRACK: bool = false;
pub const MAP_QTH_INFO: bool = true;
pub const MAP_QTH_COLOUR: u32 = 0x00FF_FFFF;

pub const PRED_MIN_EL: i64 = 5;
pub const PRED_NUM_ENTRIES: i64 = 20;
/// seconds
pub const PRED_RESOLUTION: i64 = 10;
/// days
pub const PRED_LOOK_AHEAD: i64 = 3;
pub const PRED_NUM_PASSES: i64 = 10;
