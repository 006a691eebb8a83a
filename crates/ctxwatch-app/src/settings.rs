use ctxwatch_config::ContextsConfig;
use ctxwatch_core::{BackoffPolicy, BackoffScheduler, ManagerOptions};

pub fn manager_options(config: &ContextsConfig) -> ManagerOptions {
    let policy = |multiplier, limit| BackoffPolicy {
        initial: config.backoff_initial_value(),
        multiplier,
        limit,
        jitter: config.backoff_jitter(),
    };
    ManagerOptions {
        connect_timeout: config.connect_timeout(),
        dispatch_timeout: config.dispatch_timeout(),
        backoff: BackoffScheduler {
            default: policy(config.backoff_multiplier, config.backoff_limit()),
            current_context: policy(config.backoff_multiplier_current_context, config.backoff_limit_current_context()),
        },
    }
}
