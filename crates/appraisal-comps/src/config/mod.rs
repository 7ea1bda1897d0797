use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::valuation::{
    AdjustmentConfig, CduCurve, GradeAdjustment, SelectionConfig, SimilarityWindow,
    ValuationConfig,
};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub valuation: ValuationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8001".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;
        let request_timeout =
            Duration::from_millis(parse_var("APP_REQUEST_TIMEOUT_MS", 5_000u64)?);

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let store = StoreConfig {
            data_path: env::var("PROPERTY_DATA_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            search_limit: parse_var("SEARCH_RESULT_LIMIT", 10usize)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                request_timeout,
            },
            telemetry: TelemetryConfig { log_level },
            store,
            valuation: load_valuation()?,
        })
    }
}

fn load_valuation() -> Result<ValuationConfig, ConfigError> {
    let defaults = SimilarityWindow::default();
    let window = SimilarityWindow {
        area_tolerance_pct: parse_optional_var(
            "COMPS_AREA_TOLERANCE_PCT",
            defaults.area_tolerance_pct,
        )?
        .map(|pct| non_negative("COMPS_AREA_TOLERANCE_PCT", pct))
        .transpose()?,
        land_area_tolerance_pct: parse_optional_var(
            "COMPS_LAND_AREA_TOLERANCE_PCT",
            defaults.land_area_tolerance_pct,
        )?
        .map(|pct| non_negative("COMPS_LAND_AREA_TOLERANCE_PCT", pct))
        .transpose()?,
        year_built_tolerance: parse_optional_var(
            "COMPS_YEAR_BUILT_TOLERANCE",
            defaults.year_built_tolerance,
        )?,
        cdu_tolerance: parse_optional_var("COMPS_CDU_TOLERANCE", defaults.cdu_tolerance)?
            .map(|tolerance| non_negative("COMPS_CDU_TOLERANCE", tolerance))
            .transpose()?,
    };

    let mut selection = SelectionConfig {
        window,
        grade_must_match: parse_var("COMPS_GRADE_MUST_MATCH", false)?,
        neighborhood_must_match: parse_var("COMPS_NEIGHBORHOOD_MUST_MATCH", false)?,
        minimum_comps: parse_var("COMPS_MINIMUM", 5usize)?,
        expansions: Vec::new(),
    };
    if parse_var("COMPS_EXPAND_SEARCH", false)? {
        selection = selection.with_progressive_expansion();
    }

    let curve_defaults = CduCurve::default();
    let cdu = CduCurve {
        scale: finite("CDU_SCALE", parse_var("CDU_SCALE", curve_defaults.scale)?)?,
        min_factor: finite(
            "CDU_MIN_FACTOR",
            parse_var("CDU_MIN_FACTOR", curve_defaults.min_factor)?,
        )?,
        max_factor: finite(
            "CDU_MAX_FACTOR",
            parse_var("CDU_MAX_FACTOR", curve_defaults.max_factor)?,
        )?,
    };
    if !(cdu.scale > 0.0 && cdu.min_factor > 0.0 && cdu.min_factor <= 1.0 && cdu.max_factor >= 1.0)
    {
        return Err(ConfigError::InvalidFactorBounds {
            min: cdu.min_factor,
            max: cdu.max_factor,
        });
    }

    // percent per tier; -100% or below would zero or flip the factor
    let grade = match parse_optional_var::<f64>("GRADE_STEP_PCT", None)? {
        Some(pct) if !pct.is_finite() || pct <= -100.0 => {
            return Err(ConfigError::InvalidValue {
                key: "GRADE_STEP_PCT",
                value: pct.to_string(),
            })
        }
        Some(pct) => Some(GradeAdjustment {
            step: pct / 100.0,
            min_factor: cdu.min_factor,
            max_factor: cdu.max_factor,
        }),
        None => None,
    };

    Ok(ValuationConfig {
        selection,
        adjustment: AdjustmentConfig { cdu, grade },
    })
}

fn finite(key: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
    }
}

fn non_negative(key: &'static str, value: f64) -> Result<f64, ConfigError> {
    match finite(key, value)? {
        value if value >= 0.0 => Ok(value),
        value => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .to_ascii_lowercase()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw })
        }
        _ => Ok(default),
    }
}

/// Like [`parse_var`], but `none`/`off` disables the setting.
fn parse_optional_var<T: FromStr>(
    key: &'static str,
    default: Option<T>,
) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) if matches!(raw.trim().to_ascii_lowercase().as_str(), "none" | "off") => Ok(None),
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        _ => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Location of the property export backing the in-memory store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_path: Option<PathBuf>,
    pub search_limit: usize,
}

impl StoreConfig {
    pub fn require_data_path(&self) -> Result<&PathBuf, ConfigError> {
        self.data_path.as_ref().ok_or(ConfigError::MissingDataPath)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    InvalidFactorBounds { min: f64, max: f64 },
    MissingDataPath,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
            ConfigError::InvalidFactorBounds { min, max } => write!(
                f,
                "adjustment factor bounds must satisfy 0 < min <= 1 <= max (got {min}..{max})"
            ),
            ConfigError::MissingDataPath => write!(
                f,
                "PROPERTY_DATA_PATH (or --data) must point at a property export"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
