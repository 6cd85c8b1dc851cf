pub mod analysis;
pub mod domain;
pub mod email;
pub mod ingest;
pub mod llm;
pub mod retry;
pub mod time;

pub mod config {
    use anyhow::{bail, Context};
    use chrono::NaiveTime;
    use chrono_tz::Tz;

    const DEFAULT_AI_MODEL: &str = "gemini-2.5-flash";
    const DEFAULT_REPORT_TIME: &str = "09:00";
    const DEFAULT_TIMEZONE: &str = "UTC";
    const DEFAULT_INTERVAL_DAYS: u32 = 30;
    const DEFAULT_SMTP_PORT: u16 = 587;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub target_website: Option<String>,

        pub ga_property_id: Option<String>,
        pub ga_credentials_file: Option<String>,
        pub ga_credentials_json_base64: Option<String>,

        pub google_api_key: Option<String>,
        pub ai_model: String,

        pub smtp_host: Option<String>,
        pub smtp_port: u16,
        /// STARTTLS on the submission port when true, implicit TLS otherwise.
        pub smtp_use_tls: bool,
        pub smtp_username: Option<String>,
        pub smtp_password: Option<String>,
        pub email_from: Option<String>,
        pub email_from_name: String,
        pub email_to: Option<String>,
        pub email_subject_prefix: String,
        pub error_notification_email: Option<String>,

        pub report_interval_days: u32,
        pub report_time: NaiveTime,
        pub timezone: Tz,
        pub compare_previous_period: bool,

        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Build settings from any key/value source. Blank values count as unset.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

            let ai_model = get("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string());
            if !ai_model.starts_with("gemini") {
                bail!("unsupported AI_MODEL {ai_model:?}: only gemini models are supported");
            }

            let report_time = parse_report_time(
                get("REPORT_TIME").as_deref().unwrap_or(DEFAULT_REPORT_TIME),
            )?;

            let tz_name = get("REPORT_TIMEZONE")
                .or_else(|| get("TIMEZONE"))
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
            let timezone = tz_name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("invalid REPORT_TIMEZONE {tz_name:?}: {e}"))?;

            let report_interval_days = match get("REPORT_INTERVAL_DAYS") {
                Some(s) => s
                    .trim()
                    .parse::<u32>()
                    .with_context(|| format!("REPORT_INTERVAL_DAYS is not a number: {s}"))?,
                None => DEFAULT_INTERVAL_DAYS,
            };
            anyhow::ensure!(
                report_interval_days >= 1,
                "REPORT_INTERVAL_DAYS must be >= 1 (got {report_interval_days})"
            );

            let smtp_port = match get("SMTP_PORT") {
                Some(s) => s
                    .trim()
                    .parse::<u16>()
                    .with_context(|| format!("SMTP_PORT is not a valid port: {s}"))?,
                None => DEFAULT_SMTP_PORT,
            };

            Ok(Self {
                target_website: get("TARGET_WEBSITE"),
                ga_property_id: get("GA_PROPERTY_ID"),
                ga_credentials_file: get("GA_CREDENTIALS_FILE"),
                ga_credentials_json_base64: get("GA_CREDENTIALS_JSON_BASE64"),
                google_api_key: get("GOOGLE_API_KEY"),
                ai_model,
                smtp_host: get("SMTP_HOST"),
                smtp_port,
                smtp_use_tls: parse_flag(get("SMTP_USE_TLS").as_deref(), true)?,
                smtp_username: get("SMTP_USERNAME"),
                smtp_password: get("SMTP_PASSWORD"),
                email_from: get("EMAIL_FROM"),
                email_from_name: get("EMAIL_FROM_NAME")
                    .unwrap_or_else(|| "Analytics Reporter".to_string()),
                email_to: get("EMAIL_TO"),
                email_subject_prefix: get("EMAIL_SUBJECT_PREFIX")
                    .unwrap_or_else(|| "[Analytics Report]".to_string()),
                error_notification_email: get("ERROR_NOTIFICATION_EMAIL"),
                report_interval_days,
                report_time,
                timezone,
                compare_previous_period: parse_flag(
                    get("COMPARE_PREVIOUS_PERIOD").as_deref(),
                    true,
                )?,
                sentry_dsn: get("SENTRY_DSN"),
            })
        }

        pub fn require_target_website(&self) -> anyhow::Result<&str> {
            self.target_website
                .as_deref()
                .context("TARGET_WEBSITE is required")
        }

        pub fn require_ga_property_id(&self) -> anyhow::Result<&str> {
            self.ga_property_id
                .as_deref()
                .context("GA_PROPERTY_ID is required")
        }

        pub fn require_google_api_key(&self) -> anyhow::Result<&str> {
            self.google_api_key
                .as_deref()
                .context("GOOGLE_API_KEY is required")
        }

        pub fn require_smtp_host(&self) -> anyhow::Result<&str> {
            self.smtp_host.as_deref().context("SMTP_HOST is required")
        }

        pub fn require_smtp_credentials(&self) -> anyhow::Result<(&str, &str)> {
            let user = self
                .smtp_username
                .as_deref()
                .context("SMTP_USERNAME is required")?;
            let pass = self
                .smtp_password
                .as_deref()
                .context("SMTP_PASSWORD is required")?;
            Ok((user, pass))
        }

        pub fn require_email_from(&self) -> anyhow::Result<&str> {
            self.email_from.as_deref().context("EMAIL_FROM is required")
        }

        pub fn require_email_to(&self) -> anyhow::Result<&str> {
            self.email_to.as_deref().context("EMAIL_TO is required")
        }
    }

    pub fn parse_report_time(s: &str) -> anyhow::Result<NaiveTime> {
        let invalid = || format!("REPORT_TIME must be in HH:MM format (24-hour), got {s:?}");
        let (h, m) = s.trim().split_once(':').with_context(invalid)?;
        let hours: u32 = h.parse().with_context(invalid)?;
        let minutes: u32 = m.parse().with_context(invalid)?;
        if hours > 23 || minutes > 59 {
            bail!(invalid());
        }
        NaiveTime::from_hms_opt(hours, minutes, 0).with_context(invalid)
    }

    fn parse_flag(value: Option<&str>, default: bool) -> anyhow::Result<bool> {
        let Some(v) = value else {
            return Ok(default);
        };
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => bail!("expected a boolean, got {other:?}"),
        }
    }

}
