use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// What to do when a request names a preferred doctor that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownDoctorPolicy {
    /// Fail the request with a "preferred doctor not found" error.
    #[default]
    Reject,
    /// Ignore the preference and search the full roster.
    Broaden,
}

impl FromStr for UnknownDoctorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(UnknownDoctorPolicy::Reject),
            "broaden" => Ok(UnknownDoctorPolicy::Broaden),
            other => Err(format!("unknown doctor policy '{}'", other)),
        }
    }
}

/// Tunables for the slot allocator. Defaults:
/// 14 day horizon, 30 minute steps, 20 suggestions.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub horizon_days: i64,
    pub step_minutes: i64,
    pub max_suggestions: usize,
    pub max_steps_per_doctor: usize,
    pub lookup_timeout: Duration,
    pub unknown_doctor_policy: UnknownDoctorPolicy,
}

impl SchedulerSettings {
    pub const DEFAULT_HORIZON_DAYS: i64 = 14;
    pub const DEFAULT_STEP_MINUTES: i64 = 30;
    pub const DEFAULT_MAX_SUGGESTIONS: usize = 20;
    pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5_000;
    pub const MAX_HORIZON_DAYS: i64 = 366;
    pub const MAX_SUGGESTIONS_LIMIT: usize = 1_000;

    /// Number of steps needed to cover the whole horizon once.
    pub fn steps_in_horizon(horizon_days: i64, step_minutes: i64) -> usize {
        if step_minutes <= 0 || horizon_days <= 0 {
            return 0;
        }
        let steps = horizon_days
            .checked_mul(24 * 60)
            .and_then(|minutes| minutes.checked_add(step_minutes - 1))
            .map(|minutes| minutes / step_minutes)
            .unwrap_or(i64::MAX);
        usize::try_from(steps).unwrap_or(usize::MAX)
    }

    pub fn from_env() -> Self {
        let horizon_days = env_or("SCHEDULER_HORIZON_DAYS", Self::DEFAULT_HORIZON_DAYS);
        let step_minutes = env_or("SCHEDULER_STEP_MINUTES", Self::DEFAULT_STEP_MINUTES);

        let (horizon_days, step_minutes) = if horizon_days <= 0 || step_minutes <= 0 {
            warn!(
                "Non-positive scheduler horizon ({}) or step ({}), using defaults",
                horizon_days, step_minutes
            );
            (Self::DEFAULT_HORIZON_DAYS, Self::DEFAULT_STEP_MINUTES)
        } else {
            (horizon_days, step_minutes)
        };

        let horizon_days = Self::clamp_logged("SCHEDULER_HORIZON_DAYS", horizon_days, Self::MAX_HORIZON_DAYS);

        Self {
            horizon_days,
            step_minutes,
            max_suggestions: Self::clamp_logged(
                "SCHEDULER_MAX_SUGGESTIONS",
                env_or("SCHEDULER_MAX_SUGGESTIONS", Self::DEFAULT_MAX_SUGGESTIONS),
                Self::MAX_SUGGESTIONS_LIMIT,
            ),
            max_steps_per_doctor: env_or(
                "SCHEDULER_MAX_STEPS_PER_DOCTOR",
                Self::steps_in_horizon(horizon_days, step_minutes),
            ),
            lookup_timeout: Duration::from_millis(env_or(
                "SCHEDULER_LOOKUP_TIMEOUT_MS",
                Self::DEFAULT_LOOKUP_TIMEOUT_MS,
            )),
            unknown_doctor_policy: env_or("SCHEDULER_UNKNOWN_DOCTOR_POLICY", UnknownDoctorPolicy::Reject),
        }
    }

    fn clamp_logged<T: PartialOrd + std::fmt::Display>(key: &str, value: T, max: T) -> T {
        if value > max {
            warn!("{} of {} exceeds the limit, using {}", key, value, max);
            max
        } else {
            value
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            horizon_days: Self::DEFAULT_HORIZON_DAYS,
            step_minutes: Self::DEFAULT_STEP_MINUTES,
            max_suggestions: Self::DEFAULT_MAX_SUGGESTIONS,
            max_steps_per_doctor: Self::steps_in_horizon(
                Self::DEFAULT_HORIZON_DAYS,
                Self::DEFAULT_STEP_MINUTES,
            ),
            lookup_timeout: Duration::from_millis(Self::DEFAULT_LOOKUP_TIMEOUT_MS),
            unknown_doctor_policy: UnknownDoctorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub port: u16,
    pub ping_message: String,
    pub scheduler: SchedulerSettings,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            port: env_or("PORT", 3000),
            ping_message: env::var("PING_MESSAGE").unwrap_or_else(|_| "ping".to_string()),
            scheduler: SchedulerSettings::from_env(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - database features are disabled");
        }

        config
    }

    /// True once a data source is reachable in principle.
    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
