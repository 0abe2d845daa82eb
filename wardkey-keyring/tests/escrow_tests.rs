//! Escrow gating, auditing, and the platform → org → survey unwrap chain.

use uuid::Uuid;
use wardkey_crypto::{generate_random_key, KdfParams};
use wardkey_keyring::escrow::expected_confirmation;
use wardkey_keyring::org::{provision_org_key, unwrap_org_key};
use wardkey_keyring::platform::{
    generate_platform_key, reconstruct_platform_key, MemorySecretStore,
};
use wardkey_keyring::{
    AuditAction, EscrowDenial, EscrowRequest, KeyringError, MemoryAuditSink, OrgRole,
    SurveyKeyring, UnlockSecret,
};

fn request_for(survey_id: Uuid, owner: Uuid, role: OrgRole) -> EscrowRequest {
    EscrowRequest {
        actor: Uuid::new_v4(),
        actor_role: role,
        survey_owner: owner,
        confirmation: expected_confirmation(survey_id),
    }
}

struct EscrowFixture {
    keyring: SurveyKeyring,
    survey_id: Uuid,
    owner: Uuid,
    org_key: wardkey_crypto::CipherKey,
    content: wardkey_crypto::CipherKey,
}

fn escrowed_survey() -> EscrowFixture {
    let survey_id = Uuid::new_v4();
    let content = generate_random_key();
    let org_key = generate_random_key();
    let mut keyring = SurveyKeyring::new(survey_id);
    keyring
        .enable_org_escrow(&content, Uuid::new_v4(), &org_key)
        .unwrap();
    EscrowFixture {
        keyring,
        survey_id,
        owner: Uuid::new_v4(),
        org_key,
        content,
    }
}

// ── Gates ──

#[test]
fn non_admin_is_denied_and_audited() {
    let fx = escrowed_survey();
    let audit = MemoryAuditSink::new();

    let secret = UnlockSecret::OrgEscrow {
        request: request_for(fx.survey_id, fx.owner, OrgRole::Member),
        org_key: fx.org_key.clone(),
    };
    let err = fx
        .keyring
        .unlock(&secret, &KdfParams::fast(), &audit)
        .unwrap_err();

    assert!(matches!(
        err,
        KeyringError::EscrowDenied(EscrowDenial::NotAnAdmin)
    ));
    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::EscrowUnlockDenied);
}

#[test]
fn survey_owner_must_use_their_own_access() {
    let fx = escrowed_survey();
    let audit = MemoryAuditSink::new();

    // Admin role does not exempt the owner from the self-unlock rule.
    let mut request = request_for(fx.survey_id, fx.owner, OrgRole::Admin);
    request.actor = fx.owner;

    let secret = UnlockSecret::OrgEscrow {
        request,
        org_key: fx.org_key.clone(),
    };
    let err = fx
        .keyring
        .unlock(&secret, &KdfParams::fast(), &audit)
        .unwrap_err();

    assert!(matches!(
        err,
        KeyringError::EscrowDenied(EscrowDenial::OwnerMustUseOwnAccess)
    ));
    assert_eq!(audit.events().len(), 1);
}

#[test]
fn mistyped_confirmation_is_denied() {
    let fx = escrowed_survey();
    let audit = MemoryAuditSink::new();

    let mut request = request_for(fx.survey_id, fx.owner, OrgRole::Admin);
    request.confirmation = "unlock".to_string();

    let secret = UnlockSecret::OrgEscrow {
        request,
        org_key: fx.org_key.clone(),
    };
    let err = fx
        .keyring
        .unlock(&secret, &KdfParams::fast(), &audit)
        .unwrap_err();

    assert!(matches!(
        err,
        KeyringError::EscrowDenied(EscrowDenial::ConfirmationMismatch)
    ));
}

#[test]
fn confirmation_must_name_this_survey() {
    let fx = escrowed_survey();
    let audit = MemoryAuditSink::new();

    // A confirmation copied from a different survey's dialog.
    let mut request = request_for(fx.survey_id, fx.owner, OrgRole::Admin);
    request.confirmation = expected_confirmation(Uuid::new_v4());

    let secret = UnlockSecret::OrgEscrow {
        request,
        org_key: fx.org_key.clone(),
    };
    let err = fx
        .keyring
        .unlock(&secret, &KdfParams::fast(), &audit)
        .unwrap_err();

    assert!(matches!(
        err,
        KeyringError::EscrowDenied(EscrowDenial::ConfirmationMismatch)
    ));
}

#[test]
fn expected_confirmation_spells_out_the_survey_id() {
    let survey_id = Uuid::new_v4();
    assert_eq!(
        expected_confirmation(survey_id),
        format!("unlock {survey_id}")
    );
}

// ── Outcomes past the gates ──

#[test]
fn wrong_org_key_past_the_gates_is_none_and_audited_as_failure() {
    let fx = escrowed_survey();
    let audit = MemoryAuditSink::new();

    let secret = UnlockSecret::OrgEscrow {
        request: request_for(fx.survey_id, fx.owner, OrgRole::Admin),
        org_key: generate_random_key(),
    };
    let outcome = fx
        .keyring
        .unlock(&secret, &KdfParams::fast(), &audit)
        .unwrap();

    assert!(outcome.is_none());
    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::EscrowUnlockFailed);
}

#[test]
fn successful_escrow_unlock_is_audited_with_full_context() {
    let fx = escrowed_survey();
    let audit = MemoryAuditSink::new();

    let request = request_for(fx.survey_id, fx.owner, OrgRole::Admin);
    let actor = request.actor;
    let secret = UnlockSecret::OrgEscrow {
        request,
        org_key: fx.org_key.clone(),
    };
    let grant = fx
        .keyring
        .unlock(&secret, &KdfParams::fast(), &audit)
        .unwrap()
        .unwrap();
    assert_eq!(grant.content_key.as_bytes(), fx.content.as_bytes());

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::EscrowUnlockSucceeded);
    assert_eq!(events[0].actor, actor);
    assert_eq!(events[0].survey_id, fx.survey_id);
    assert_eq!(events[0].target_user, Some(fx.owner));
    assert!(events[0].org_id.is_some());
}

// ── Full platform chain ──

#[test]
fn custodian_shares_recover_the_chain_down_to_survey_content() {
    // Platform key generation stores the vault component and splits the
    // custodian component 3-of-4.
    let store = MemorySecretStore::new();
    let (platform, custodians) = generate_platform_key(&store, 3, 4).unwrap();

    // Org provisioning wraps a fresh org master key under the platform key.
    let org_id = Uuid::new_v4();
    let (org_record, org_key) = provision_org_key(&platform, org_id).unwrap();

    // A survey escrows its content key under that org key.
    let survey_id = Uuid::new_v4();
    let content = generate_random_key();
    let mut keyring = SurveyKeyring::new(survey_id);
    keyring.enable_org_escrow(&content, org_id, &org_key).unwrap();
    drop(platform);
    drop(org_key);

    // Disaster drill: three custodians reconstruct the platform key, which
    // unwraps the org key, which frees the survey content key.
    let recovered_platform =
        reconstruct_platform_key(&store, &custodians.shares[..3], 3).unwrap();
    let recovered_org_key = unwrap_org_key(&recovered_platform, &org_record).unwrap();

    let audit = MemoryAuditSink::new();
    let secret = UnlockSecret::OrgEscrow {
        request: request_for(survey_id, Uuid::new_v4(), OrgRole::Admin),
        org_key: recovered_org_key,
    };
    let grant = keyring
        .unlock(&secret, &KdfParams::fast(), &audit)
        .unwrap()
        .unwrap();
    assert_eq!(grant.content_key.as_bytes(), content.as_bytes());
}
