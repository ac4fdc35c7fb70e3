use msidh_crypto::config::GenerationConfig;
use msidh_crypto::errors::MsidhError;
use msidh_crypto::exchange::{Channel, ExchangeOrchestrator};
use msidh_crypto::keypair::{ClassicDh, KeyExchange, MSidh, Role, Sidh};
use msidh_crypto::params::{ParameterFactory, SchemeParameters};
use msidh_crypto::party::{Party, PartyState};
use msidh_crypto::provider::ReferenceProvider;

use std::sync::{Arc, Once};

use rand::SeedableRng;
use rand::rngs::StdRng;

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

type ToySetup = (Arc<ReferenceProvider>, Arc<SchemeParameters<ReferenceProvider>>);

fn toy_parameters() -> Result<ToySetup, MsidhError> {
    init_logging();
    let provider = Arc::new(ReferenceProvider::new());
    let factory = ParameterFactory::new(provider.clone(), GenerationConfig::default());
    let params = factory.from_preset("toy", &mut StdRng::seed_from_u64(2024))?;
    Ok((provider, Arc::new(params)))
}

#[test]
fn sidh_round_agrees() -> Result<(), MsidhError> {
    let (provider, params) = toy_parameters()?;
    let orchestrator = ExchangeOrchestrator::new(Arc::new(Sidh::new(provider, params)));

    let report = orchestrator.run_round()?;
    assert!(report.success);
    assert_eq!(report.secrets.0, report.secrets.1);
    assert_eq!(report.messages, 2);
    Ok(())
}

#[test]
fn msidh_rounds_agree() -> Result<(), MsidhError> {
    let (provider, params) = toy_parameters()?;
    let orchestrator = ExchangeOrchestrator::new(Arc::new(MSidh::new(provider, params)));

    let stats = orchestrator.run_rounds(3)?;
    assert_eq!(stats.rounds, 3);
    assert_eq!(stats.failures, 0);
    assert!(stats.bytes_per_round > 0);
    Ok(())
}

#[test]
fn generated_parameters_support_msidh() -> Result<(), MsidhError> {
    init_logging();
    let provider = Arc::new(ReferenceProvider::new());
    let factory = ParameterFactory::new(provider.clone(), GenerationConfig::default());
    let params = Arc::new(factory.generate(2, &mut StdRng::seed_from_u64(11))?);
    assert_eq!(params.p().to_string(), "419");

    let orchestrator = ExchangeOrchestrator::new(Arc::new(MSidh::new(provider, params)));
    assert!(orchestrator.run_round()?.success);
    Ok(())
}

#[test]
fn swapped_public_key_is_rejected() -> Result<(), MsidhError> {
    let (provider, params) = toy_parameters()?;
    let scheme = Arc::new(MSidh::new(provider, params));
    let mut rng = StdRng::seed_from_u64(3);

    let mut alice = Party::new(Role::A, scheme.clone());
    let mut bob = Party::new(Role::B, scheme);
    alice.generate_private_key(&mut rng)?;
    bob.generate_private_key(&mut rng)?;
    alice.compute_public_key()?;
    let pk_b = bob.compute_public_key()?.swapped();

    let mut channel = Channel::new();
    channel.transmit(&mut alice, pk_b)?;

    let result = alice.compute_shared_secret();
    assert!(matches!(result, Err(MsidhError::PairingMismatch(_))));
    assert_eq!(alice.state(), PartyState::PeerKeyRegistered);
    assert!(alice.shared_secret().is_none());
    Ok(())
}

#[test]
fn plain_party_accepts_masked_peer_key() -> Result<(), MsidhError> {
    let (provider, params) = toy_parameters()?;
    let sidh = Sidh::new(provider.clone(), params.clone());
    let msidh = MSidh::new(provider, params);
    let mut rng = StdRng::seed_from_u64(8);

    // Masked images still satisfy the pairing relation, so both schemes interoperate
    // at the level of the check.
    let sk_b = msidh.generate_private_key(Role::B, &mut rng)?;
    let pk_b = msidh.compute_public_key(Role::B, &sk_b)?;
    let sk_a = sidh.generate_private_key(Role::A, &mut rng)?;
    assert!(sidh.compute_shared_secret(Role::A, &sk_a, &pk_b).is_ok());
    Ok(())
}

#[test]
fn ordering_violation_reports_state() -> Result<(), MsidhError> {
    let (provider, params) = toy_parameters()?;
    let mut party = Party::new(Role::B, Arc::new(Sidh::new(provider, params)));

    match party.compute_shared_secret() {
        Err(MsidhError::OrderingViolation { operation, state }) => {
            assert_eq!(operation, "compute_shared_secret");
            assert_eq!(state, PartyState::Created);
        }
        other => panic!("expected an ordering violation, got {:?}", other.map(|_| ())),
    }
    assert!(party.describe().contains("SIDH"));
    Ok(())
}

#[test]
fn classic_round_through_orchestrator() -> Result<(), MsidhError> {
    init_logging();
    let scheme = ClassicDh::with_default_modulus(&mut StdRng::seed_from_u64(1))?;
    let orchestrator = ExchangeOrchestrator::new(Arc::new(scheme));

    let stats = orchestrator.run_rounds(5)?;
    assert_eq!(stats.failures, 0);
    assert!(stats.min <= stats.max);
    Ok(())
}
