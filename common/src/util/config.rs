use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub autoroute: AutorouteConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autoroute: AutorouteConfig::default(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleRestriction {
    NinetyDegree,
    FortyFiveDegree,
    None,
}

/// Verbosity of geometric anomaly reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestLevel {
    Release,
    Warnings,
    AllDebuggingOutput,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AutorouteConfig {
    #[serde(default = "default_angle_restriction")]
    pub angle_restriction: AngleRestriction,
    #[serde(default = "default_maintain_database")]
    pub maintain_database: bool,
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: Option<u64>,
    /// Frontier elements one connection search may expand before it stops.
    #[serde(default = "default_max_expansions")]
    pub max_expansions: Option<usize>,
    #[serde(default = "default_preferred_direction_trace_cost")]
    pub preferred_direction_trace_cost: f64,
    #[serde(default = "default_against_preferred_direction_trace_cost")]
    pub against_preferred_direction_trace_cost: f64,
    #[serde(default = "default_via_cost")]
    pub via_cost: f64,
    #[serde(default = "default_vias_allowed")]
    pub vias_allowed: bool,
    #[serde(default = "default_ripup_allowed")]
    pub ripup_allowed: bool,
    #[serde(default = "default_ripup_costs")]
    pub ripup_costs: f64,
    #[serde(default = "default_remove_unconnected_vias")]
    pub remove_unconnected_vias: bool,
    #[serde(default = "default_max_enlarge_iterations")]
    pub max_enlarge_iterations: usize,
    #[serde(default = "default_min_drill_page_width")]
    pub min_drill_page_width: i64,
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
    #[serde(default = "default_test_level")]
    pub test_level: TestLevel,
}

impl Default for AutorouteConfig {
    fn default() -> Self {
        Self {
            angle_restriction: default_angle_restriction(),
            maintain_database: default_maintain_database(),
            time_limit_ms: default_time_limit_ms(),
            max_expansions: default_max_expansions(),
            preferred_direction_trace_cost: default_preferred_direction_trace_cost(),
            against_preferred_direction_trace_cost: default_against_preferred_direction_trace_cost(),
            via_cost: default_via_cost(),
            vias_allowed: default_vias_allowed(),
            ripup_allowed: default_ripup_allowed(),
            ripup_costs: default_ripup_costs(),
            remove_unconnected_vias: default_remove_unconnected_vias(),
            max_enlarge_iterations: default_max_enlarge_iterations(),
            min_drill_page_width: default_min_drill_page_width(),
            max_passes: default_max_passes(),
            test_level: default_test_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_board_file")]
    pub board_file: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            board_file: default_board_file(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_routed_board")]
    pub routed_board: String,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    #[serde(default = "default_draw_rooms")]
    pub draw_rooms: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            routed_board: default_routed_board(),
            image: default_image(),
            image_size: default_image_size(),
            draw_rooms: default_draw_rooms(),
        }
    }
}

fn default_angle_restriction() -> AngleRestriction {
    AngleRestriction::FortyFiveDegree
}

fn default_maintain_database() -> bool {
    false
}

fn default_time_limit_ms() -> Option<u64> {
    None
}

fn default_max_expansions() -> Option<usize> {
    None
}

fn default_preferred_direction_trace_cost() -> f64 {
    1.0
}

fn default_against_preferred_direction_trace_cost() -> f64 {
    1.5
}

fn default_via_cost() -> f64 {
    50.0
}

fn default_vias_allowed() -> bool {
    true
}

fn default_ripup_allowed() -> bool {
    false
}

fn default_ripup_costs() -> f64 {
    100.0
}

fn default_remove_unconnected_vias() -> bool {
    true
}

fn default_max_enlarge_iterations() -> usize {
    32
}

fn default_min_drill_page_width() -> i64 {
    10000
}

fn default_max_passes() -> usize {
    4
}

fn default_test_level() -> TestLevel {
    TestLevel::Release
}

fn default_board_file() -> String {
    "inputs/board.toml".to_string()
}

fn default_routed_board() -> String {
    "output/routed.toml".to_string()
}

fn default_image() -> String {
    "output/routed.png".to_string()
}

fn default_image_size() -> u32 {
    1000
}

fn default_draw_rooms() -> bool {
    false
}
