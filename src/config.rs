use std::path::PathBuf;

use perf_tracker::services::scoring::Gender;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Directory holding the persisted collection (`perfs.json`).
    pub data_dir: PathBuf,
    /// IAAF coefficient table, loaded once at start-up.
    pub scoring_table_path: PathBuf,
    /// Gender used for scoring; scoring is disabled when unset.
    pub athlete_gender: Option<Gender>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir =
            PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()));
        let scoring_table_path = std::env::var("SCORING_TABLE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("iaaf_scoring_formulas.json"));

        Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a valid u16"),
            data_dir,
            scoring_table_path,
            athlete_gender: std::env::var("ATHLETE_GENDER")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| {
                    v.parse()
                        .unwrap_or_else(|e| panic!("ATHLETE_GENDER is invalid: {}", e))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // Only this test touches these variables.
        unsafe {
            std::env::remove_var("PORT");
            std::env::remove_var("DATA_DIR");
            std::env::remove_var("SCORING_TABLE_PATH");
            std::env::remove_var("ATHLETE_GENDER");
        }

        let config = AppConfig::from_env();

        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(
            config.scoring_table_path,
            PathBuf::from("./data/iaaf_scoring_formulas.json")
        );
        assert_eq!(config.athlete_gender, None);
    }
}
