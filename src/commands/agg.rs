use super::{AppState, Command};
use crate::errors::{AppError, AppResult};
use crate::fetch;
use crate::scheduler::{self, SchedulerOptions, MAX_WORKERS};

/// Starts the polling loop. Runs until Ctrl-C.
pub fn agg(state: &mut AppState, cmd: &Command) -> AppResult<()> {
    const USAGE: &str = "agg <interval> [workers]";
    let interval = scheduler::parse_interval(cmd.arg(0, USAGE)?)?;
    let workers: usize = match cmd.args.get(1) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Validation(format!("invalid worker count: {raw}")))?,
        None => 1,
    };
    if workers == 0 || workers > MAX_WORKERS {
        return Err(AppError::Validation(format!(
            "worker count must be between 1 and {MAX_WORKERS}"
        )));
    }

    let options = SchedulerOptions {
        interval,
        workers,
        fetch_timeout: fetch::DEFAULT_FETCH_TIMEOUT,
    };
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(scheduler::run(state.pool.clone(), options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_helpers::get_test_db_pool;

    fn test_state() -> AppState {
        AppState {
            config: Config {
                db_url: ":memory:".to_string(),
                current_user_name: None,
            },
            pool: get_test_db_pool(),
        }
    }

    fn agg_cmd(args: &[&str]) -> Command {
        Command {
            name: "agg".to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_missing_interval_is_usage_error() {
        let err = agg(&mut test_state(), &agg_cmd(&[])).unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));
    }

    #[test]
    fn test_bad_interval_rejected() {
        let err = agg(&mut test_state(), &agg_cmd(&["soon"])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = agg(&mut test_state(), &agg_cmd(&["30s", "0"])).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_excessive_workers_rejected() {
        for raw in ["65", "1000000", "18446744073709551616"] {
            let err = agg(&mut test_state(), &agg_cmd(&["30s", raw])).unwrap_err();
            assert!(
                matches!(err, AppError::Validation(_)),
                "expected rejection for {raw:?}"
            );
        }
    }
}
