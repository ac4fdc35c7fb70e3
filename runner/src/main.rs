mod settings;

use settings::{ParameterSource, RunnerSettings, SchemeKind};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use env_logger::Env;
use log::{LevelFilter, error, info, warn};
use msidh_crypto::config::CancellationToken;
use msidh_crypto::errors::MsidhError;
use msidh_crypto::exchange::{ExchangeOrchestrator, RoundStatistics};
use msidh_crypto::keypair::{ClassicDh, KeyExchange, MSidh, Sidh};
use msidh_crypto::params::{ParameterFactory, SchemeParameters};
use msidh_crypto::preset;
use msidh_crypto::provider::ReferenceProvider;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

/// Logged as JSON once all rounds are done.
#[derive(Serialize)]
struct RunSummary {
    started_at: DateTime<Local>,
    finished_at: DateTime<Local>,
    scheme: SchemeKind,
    parameters: String,
    statistics: RoundStatistics,
}

fn main() {
    let settings = match RunnerSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            init_logging(false);
            error!("Cannot read settings: {}", e);
            std::process::exit(2);
        }
    };
    init_logging(settings.debug);

    if let Err(e) = run(&settings) {
        error!("Run failed: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default));
    builder.format_timestamp(None);
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    let _ = builder.try_init();
}

fn run(settings: &RunnerSettings) -> Result<(), MsidhError> {
    let started_at = Local::now();
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    info!("Running {} rounds of {}", settings.rounds, settings.scheme);

    let (description, statistics) = match settings.scheme {
        SchemeKind::Classic => {
            let scheme = ClassicDh::try_with_modulus(settings.classic_modulus.into(), &mut rng)?;
            run_rounds(scheme, settings.rounds)?
        }
        SchemeKind::Sidh => {
            let (provider, params) = isogeny_parameters(settings, &mut rng)?;
            run_rounds(Sidh::new(provider, params), settings.rounds)?
        }
        SchemeKind::Msidh => {
            let (provider, params) = isogeny_parameters(settings, &mut rng)?;
            run_rounds(MSidh::new(provider, params), settings.rounds)?
        }
    };

    info!("Statistics: {}", statistics);
    let summary = RunSummary {
        started_at,
        finished_at: Local::now(),
        scheme: settings.scheme,
        parameters: description,
        statistics,
    };
    info!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

type IsogenySetup = (Arc<ReferenceProvider>, Arc<SchemeParameters<ReferenceProvider>>);

fn isogeny_parameters(
    settings: &RunnerSettings,
    rng: &mut StdRng,
) -> Result<IsogenySetup, MsidhError> {
    let provider = ReferenceProvider::new().with_primality_rounds(settings.primality_rounds);
    let provider = Arc::new(provider);
    let token = match settings.timeout_secs {
        Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
        None => CancellationToken::new(),
    };
    let factory = ParameterFactory::new(provider.clone(), settings.generation.clone())
        .with_cancellation(token);

    let params = match &settings.parameters {
        ParameterSource::Preset(name) => {
            let masked = preset::preset(name)?.is_masked();
            if masked != (settings.scheme == SchemeKind::Msidh) {
                warn!("Preset {} was designed for the other variant", name);
            }
            factory.from_preset(name, rng)?
        }
        ParameterSource::SecurityLevel(lambda) => factory.generate(*lambda, rng)?,
        ParameterSource::Snapshot(path) => {
            SchemeParameters::load(provider.as_ref(), factory.config(), path)?
        }
    };
    info!("Using {}", params);

    if let Some(path) = &settings.save_snapshot {
        params.save(path)?;
    }
    Ok((provider, Arc::new(params)))
}

fn run_rounds<S: KeyExchange>(
    scheme: S,
    rounds: usize,
) -> Result<(String, RoundStatistics), MsidhError> {
    let description = scheme.describe_public_parameters();
    let orchestrator = ExchangeOrchestrator::new(Arc::new(scheme));
    let statistics = orchestrator.run_rounds(rounds)?;
    if statistics.failures > 0 {
        warn!("{} of {} rounds disagreed", statistics.failures, statistics.rounds);
    }
    Ok((description, statistics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use msidh_crypto::provider::AlgebraProvider;

    #[test]
    fn test_toy_setup_with_custom_primality_rounds() -> Result<(), MsidhError> {
        let settings = RunnerSettings {
            primality_rounds: 1,
            ..RunnerSettings::default()
        };
        let (provider, params) = isogeny_parameters(&settings, &mut StdRng::seed_from_u64(3))?;

        assert_eq!(params.p().to_string(), "863");
        assert!(provider.is_prime(params.p()));
        Ok(())
    }
}
