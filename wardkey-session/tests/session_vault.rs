//! Session vault scenarios: remember, re-derive, expire, and clear.

use chrono::Duration;
use uuid::Uuid;
use wardkey_crypto::{generate_random_key, CipherKey, KdfParams};
use wardkey_keyring::{
    MemoryAuditSink, PasswordCredential, ReplayCredential, SurveyKeyring, UnlockSecret,
};
use wardkey_session::SessionKeyVault;

const PASSWORD: &str = "winter lantern 44";

/// A keyring with the password strategy configured, already unlocked once.
fn unlocked_survey() -> (SurveyKeyring, CipherKey, ReplayCredential) {
    let content = generate_random_key();
    let mut keyring = SurveyKeyring::new(Uuid::new_v4());
    keyring
        .enable_password_recovery(&content, PASSWORD, &KdfParams::fast())
        .unwrap();

    let audit = MemoryAuditSink::new();
    let grant = keyring
        .unlock(
            &UnlockSecret::Password(PASSWORD.to_string()),
            &KdfParams::fast(),
            &audit,
        )
        .unwrap()
        .unwrap();
    (keyring, content, grant.replay)
}

#[test]
fn remembered_credential_rederives_the_content_key() {
    let (keyring, content, replay) = unlocked_survey();
    let vault = SessionKeyVault::new();
    vault
        .remember("sess-1", keyring.survey_id(), &replay)
        .unwrap();

    let rederived = vault
        .rederive("sess-1", keyring.survey_id(), &keyring)
        .unwrap();
    assert_eq!(rederived.as_bytes(), content.as_bytes());
}

#[test]
fn rederivation_is_repeatable_while_the_entry_lives() {
    let (keyring, content, replay) = unlocked_survey();
    let vault = SessionKeyVault::new();
    vault
        .remember("sess-1", keyring.survey_id(), &replay)
        .unwrap();

    for _ in 0..3 {
        let rederived = vault
            .rederive("sess-1", keyring.survey_id(), &keyring)
            .unwrap();
        assert_eq!(rederived.as_bytes(), content.as_bytes());
    }
}

#[test]
fn expired_entry_behaves_exactly_like_absent() {
    let (keyring, _, replay) = unlocked_survey();
    let vault = SessionKeyVault::with_ttl(Duration::zero());
    vault
        .remember("sess-1", keyring.survey_id(), &replay)
        .unwrap();

    assert!(vault
        .rederive("sess-1", keyring.survey_id(), &keyring)
        .is_none());
    // Expiry discarded the entry; a second attempt is plain absent.
    assert!(vault
        .rederive("sess-1", keyring.survey_id(), &keyring)
        .is_none());
}

#[test]
fn another_session_cannot_borrow_the_entry() {
    let (keyring, _, replay) = unlocked_survey();
    let vault = SessionKeyVault::new();
    vault
        .remember("sess-alice", keyring.survey_id(), &replay)
        .unwrap();

    assert!(vault
        .rederive("sess-mallory", keyring.survey_id(), &keyring)
        .is_none());
}

#[test]
fn another_survey_cannot_borrow_the_entry() {
    let (keyring, _, replay) = unlocked_survey();
    let (other_keyring, _, _) = unlocked_survey();
    let vault = SessionKeyVault::new();
    vault
        .remember("sess-1", keyring.survey_id(), &replay)
        .unwrap();

    assert!(vault
        .rederive("sess-1", other_keyring.survey_id(), &other_keyring)
        .is_none());
}

#[test]
fn mismatched_keyring_is_refused_outright() {
    let (keyring, _, replay) = unlocked_survey();
    let (other_keyring, _, _) = unlocked_survey();
    let vault = SessionKeyVault::new();
    vault
        .remember("sess-1", keyring.survey_id(), &replay)
        .unwrap();

    // Right survey id, wrong keyring handed in by the caller.
    assert!(vault
        .rederive("sess-1", keyring.survey_id(), &other_keyring)
        .is_none());
}

#[test]
fn password_rotation_kills_live_sessions() {
    let (mut keyring, _, replay) = unlocked_survey();
    let vault = SessionKeyVault::new();
    vault
        .remember("sess-1", keyring.survey_id(), &replay)
        .unwrap();

    keyring
        .rotate_password(
            PasswordCredential::Password(PASSWORD),
            "rotated password 9",
            &KdfParams::fast(),
        )
        .unwrap();

    assert!(vault
        .rederive("sess-1", keyring.survey_id(), &keyring)
        .is_none());
}

#[test]
fn clear_drops_a_single_slot() {
    let (keyring, _, replay) = unlocked_survey();
    let vault = SessionKeyVault::new();
    vault
        .remember("sess-1", keyring.survey_id(), &replay)
        .unwrap();

    vault.clear("sess-1", keyring.survey_id());
    assert!(vault
        .rederive("sess-1", keyring.survey_id(), &keyring)
        .is_none());
}

#[test]
fn clear_session_drops_every_survey_for_that_session_only() {
    let (keyring_a, _, replay_a) = unlocked_survey();
    let (keyring_b, _, replay_b) = unlocked_survey();
    let vault = SessionKeyVault::new();

    vault
        .remember("sess-1", keyring_a.survey_id(), &replay_a)
        .unwrap();
    vault
        .remember("sess-1", keyring_b.survey_id(), &replay_b)
        .unwrap();
    vault
        .remember("sess-2", keyring_a.survey_id(), &replay_a)
        .unwrap();

    vault.clear_session("sess-1");

    assert!(vault
        .rederive("sess-1", keyring_a.survey_id(), &keyring_a)
        .is_none());
    assert!(vault
        .rederive("sess-1", keyring_b.survey_id(), &keyring_b)
        .is_none());
    // The other session's entry survives the logout.
    assert!(vault
        .rederive("sess-2", keyring_a.survey_id(), &keyring_a)
        .is_some());
}
