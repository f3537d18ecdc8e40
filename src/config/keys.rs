//! Section and key names

pub const SECTION_POLAR: &str = "POLAR";
pub const SECTION_MAP: &str = "MAP";
pub const SECTION_PREDICT: &str = "PREDICT";

// shared by both views
pub const REFRESH: &str = "REFRESH";
pub const NEXT_EVENT: &str = "NEXT_EVENT";
pub const CURSOR_TRACK: &str = "CURSOR_TRACK";
pub const SAT_COLOUR: &str = "SAT_COLOUR";
pub const SAT_SEL_COLOUR: &str = "SAT_SEL_COLOUR";
pub const TRACK_COLOUR: &str = "TRACK_COLOUR";
pub const INFO_COLOUR: &str = "INFO_COLOUR";
pub const SHOWTRACKS: &str = "SHOWTRACKS";
pub const QTH_INFO: &str = "QTH_INFO";

// polar
pub const ORIENTATION: &str = "ORIENTATION";
pub const SHOW_TRACK: &str = "SHOW_TRACK";
pub const HIDETRACKS: &str = "HIDETRACKS";
pub const AXIS_COLOUR: &str = "AXIS_COLOUR";
pub const TICK_COLOUR: &str = "TICK_COLOUR";

// map
pub const CENTER: &str = "CENTER";
pub const COV_AREA_COLOUR: &str = "COV_AREA_COLOUR";
pub const TRACK_NUMBER: &str = "TRACK_NUMBER";
pub const KEEP_RATIO: &str = "KEEP_RATIO";
pub const SHADOW_ALPHA: &str = "SHADOW_ALPHA";
pub const HIDECOVS: &str = "HIDECOVS";
pub const QTH_COLOUR: &str = "QTH_COLOUR";

// predict
pub const MINIMUM_ELEV: &str = "MINIMUM_ELEV";
pub const NUMBER_OF_ENTRIES: &str = "NUMBER_OF_ENTRIES";
pub const TIME_RESOLUTION: &str = "TIME_RESOLUTION";
pub const LOOK_AHEAD: &str = "LOOK_AHEAD";
pub const NUMBER_OF_PASSES: &str = "NUMBER_OF_PASSES";
