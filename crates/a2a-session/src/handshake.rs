//! Six-step cryptographic handshake protocol.
//!
//! The state machine is driven through an explicit [`HandshakeDriver`] owned
//! per-session, guarded by a `tokio::sync::Mutex` (the session map itself
//! shards across sessions, per `a2a-session::manager`).

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use a2a_crypto::agreement::SESSION_KEY_INFO;
use a2a_crypto::{sign, verify, AgreementKeyPair};
use a2a_types::message::{canonicalize, PROTOCOL_VERSION};
use a2a_types::session::SessionState;

use crate::error::SessionError;

fn b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn from_b64(s: &str) -> Result<Vec<u8>, SessionError> {
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| SessionError::HandshakeFailed(format!("bad base64: {e}")))
}

fn random_bytes_32() -> [u8; 32] {
    let mut buf = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// Envelope common to every handshake step, signed over its own
/// `signature`-less canonical JSON bytes (same rule as
/// [`a2a_types::message::SecureMessage::canonical_bytes`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeEnvelope {
    pub version: String,
    pub session_id: String,
    pub sender_id: String,
    pub timestamp: DateTime<Utc>,
    pub nonce: String,
    /// Present only on steps 1–2 (`handshake_init`, `handshake_init_ack`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ed25519_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x25519_public_key: Option<String>,
    /// `handshake_init_ack` only: 32 random challenge bytes, base64.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    /// `challenge_response` only: signature over the raw challenge bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_signature: Option<String>,
    /// `session_established` / `session_confirm`: opaque confirmation token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_token: Option<String>,
    #[serde(default)]
    pub signature: String,
}

impl HandshakeEnvelope {
    fn canonical_bytes(&self) -> Result<Vec<u8>, SessionError> {
        let mut value = serde_json::to_value(self).map_err(|e| SessionError::HandshakeFailed(e.to_string()))?;
        if let Value::Object(ref mut map) = value {
            map.remove("signature");
        }
        canonicalize(&value).map_err(|e| SessionError::HandshakeFailed(e.to_string()))
    }

    fn sign_with(&mut self, seed: &[u8; 32]) -> Result<(), SessionError> {
        let bytes = self.canonical_bytes()?;
        self.signature = b64(&sign(seed, &bytes));
        Ok(())
    }

    fn verify_with(&self, ed25519_public_key_b64: &str) -> Result<(), SessionError> {
        let pubkey = from_b64(ed25519_public_key_b64)?;
        let sig = from_b64(&self.signature)?;
        let mut unsigned = self.clone();
        unsigned.signature = String::new();
        let bytes = unsigned.canonical_bytes()?;
        if verify(&pubkey, &bytes, &sig) {
            Ok(())
        } else {
            Err(SessionError::HandshakeFailed("signature verification failed".into()))
        }
    }
}

/// Drives one side of a single handshake. Not `Clone`: the ephemeral
/// X25519 secret is consumed exactly once, by [`HandshakeDriver::agree`].
pub struct HandshakeDriver {
    pub session_id: String,
    pub local_id: String,
    pub peer_id: Option<String>,
    pub state: SessionState,
    started_at: DateTime<Utc>,
    timeout: Duration,
    local_ed25519_seed: [u8; 32],
    local_ed25519_public: [u8; 32],
    local_x25519: Option<AgreementKeyPair>,
    local_x25519_public: [u8; 32],
    peer_ed25519_public: Option<[u8; 32]>,
    peer_x25519_public: Option<[u8; 32]>,
    challenge: Option<[u8; 32]>,
    confirmation_token: Option<Vec<u8>>,
    session_key: Option<[u8; 32]>,
    /// Which side of the handshake this driver plays, learned the moment
    /// the first message is sent or received (`initiate()` vs `on_init()`).
    /// Needed so the HKDF salt can be built in a role-canonical order
    /// (initiator's keys first) rather than a perspective-dependent
    /// local/peer order, which would otherwise diverge between the two
    /// sides.
    is_initiator: Option<bool>,
}

impl HandshakeDriver {
    pub fn new(session_id: impl Into<String>, local_id: impl Into<String>, local_ed25519_seed: [u8; 32], timeout: Duration) -> Self {
        let local_x25519 = AgreementKeyPair::generate();
        let local_x25519_public = local_x25519.public_key();
        let local_ed25519_public = a2a_crypto::KeyPair::from_seed(&local_ed25519_seed).public_key();
        Self {
            session_id: session_id.into(),
            local_id: local_id.into(),
            peer_id: None,
            state: SessionState::Initial,
            started_at: Utc::now(),
            timeout,
            local_ed25519_seed,
            local_ed25519_public,
            local_x25519: Some(local_x25519),
            local_x25519_public,
            peer_ed25519_public: None,
            peer_x25519_public: None,
            challenge: None,
            confirmation_token: None,
            session_key: None,
            is_initiator: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() - self.started_at > self.timeout
    }

    fn require_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state.is_terminal() || self.state != expected {
            return Err(SessionError::InvalidTransition {
                from: format!("{:?}", self.state),
                attempted: format!("{expected:?}"),
            });
        }
        Ok(())
    }

    fn base_envelope(&self) -> HandshakeEnvelope {
        HandshakeEnvelope {
            version: PROTOCOL_VERSION.to_string(),
            session_id: self.session_id.clone(),
            sender_id: self.local_id.clone(),
            timestamp: Utc::now(),
            nonce: b64(&random_bytes_32()),
            ed25519_public_key: None,
            x25519_public_key: None,
            challenge: None,
            challenge_signature: None,
            confirmation_token: None,
            signature: String::new(),
        }
    }

    /// Step 1 (initiator): `INITIAL -> InitSent`.
    pub fn initiate(&mut self) -> Result<HandshakeEnvelope, SessionError> {
        self.require_state(SessionState::Initial)?;
        self.is_initiator = Some(true);
        let mut msg = self.base_envelope();
        msg.ed25519_public_key = Some(b64(&self.local_ed25519_public));
        msg.x25519_public_key = Some(b64(&self.local_x25519_public));
        msg.sign_with(&self.local_ed25519_seed)?;
        self.state = SessionState::InitSent;
        Ok(msg)
    }

    /// Step 1→2 (responder): on receiving `handshake_init`, issues the
    /// challenge. `INITIAL -> ChallengeSent`.
    pub fn on_init(&mut self, init: &HandshakeEnvelope) -> Result<HandshakeEnvelope, SessionError> {
        self.require_state(SessionState::Initial)?;
        self.is_initiator = Some(false);
        let peer_ed25519 = init
            .ed25519_public_key
            .as_deref()
            .ok_or_else(|| SessionError::HandshakeFailed("missing ed25519 key in init".into()))?;
        init.verify_with(peer_ed25519)?;
        let peer_x25519: [u8; 32] = from_b64(
            init.x25519_public_key
                .as_deref()
                .ok_or_else(|| SessionError::HandshakeFailed("missing x25519 key in init".into()))?,
        )?
        .try_into()
        .map_err(|_| SessionError::HandshakeFailed("malformed x25519 key".into()))?;

        self.peer_id = Some(init.sender_id.clone());
        self.peer_ed25519_public = Some(from_b64(peer_ed25519)?.try_into().map_err(|_| SessionError::HandshakeFailed("malformed ed25519 key".into()))?);
        self.peer_x25519_public = Some(peer_x25519);

        let challenge = random_bytes_32();
        self.challenge = Some(challenge);

        let mut msg = self.base_envelope();
        msg.ed25519_public_key = Some(b64(&self.local_ed25519_public));
        msg.x25519_public_key = Some(b64(&self.local_x25519_public));
        msg.challenge = Some(b64(&challenge));
        msg.sign_with(&self.local_ed25519_seed)?;
        self.state = SessionState::ChallengeSent;
        Ok(msg)
    }

    /// Step 2→3 (initiator): on receiving `handshake_init_ack`, answers the
    /// challenge. `InitSent -> AckReceived`.
    pub fn on_ack(&mut self, ack: &HandshakeEnvelope) -> Result<HandshakeEnvelope, SessionError> {
        self.require_state(SessionState::InitSent)?;
        let peer_ed25519_b64 = ack
            .ed25519_public_key
            .as_deref()
            .ok_or_else(|| SessionError::HandshakeFailed("missing ed25519 key in ack".into()))?;
        ack.verify_with(peer_ed25519_b64)?;

        let peer_x25519: [u8; 32] = from_b64(
            ack.x25519_public_key
                .as_deref()
                .ok_or_else(|| SessionError::HandshakeFailed("missing x25519 key in ack".into()))?,
        )?
        .try_into()
        .map_err(|_| SessionError::HandshakeFailed("malformed x25519 key".into()))?;
        let challenge: [u8; 32] = from_b64(
            ack.challenge
                .as_deref()
                .ok_or_else(|| SessionError::HandshakeFailed("missing challenge in ack".into()))?,
        )?
        .try_into()
        .map_err(|_| SessionError::HandshakeFailed("malformed challenge".into()))?;

        self.peer_id = Some(ack.sender_id.clone());
        self.peer_ed25519_public = Some(from_b64(peer_ed25519_b64)?.try_into().map_err(|_| SessionError::HandshakeFailed("malformed ed25519 key".into()))?);
        self.peer_x25519_public = Some(peer_x25519);

        let mut msg = self.base_envelope();
        msg.challenge_signature = Some(b64(&sign(&self.local_ed25519_seed, &challenge)));
        msg.sign_with(&self.local_ed25519_seed)?;
        self.state = SessionState::AckReceived;
        Ok(msg)
    }

    /// Step 3→4 (responder): verifies the challenge response, derives the
    /// session key, and issues `session_established`.
    /// `ChallengeSent -> Established`.
    pub fn on_challenge_response(&mut self, resp: &HandshakeEnvelope) -> Result<HandshakeEnvelope, SessionError> {
        self.require_state(SessionState::ChallengeSent)?;
        let peer_ed25519 = self
            .peer_ed25519_public
            .ok_or_else(|| SessionError::HandshakeFailed("peer key not learned".into()))?;
        resp.verify_with(&b64(&peer_ed25519))?;

        let challenge = self.challenge.ok_or_else(|| SessionError::HandshakeFailed("no challenge issued".into()))?;
        let challenge_sig = from_b64(
            resp.challenge_signature
                .as_deref()
                .ok_or_else(|| SessionError::HandshakeFailed("missing challenge signature".into()))?,
        )?;
        if !verify(&peer_ed25519, &challenge, &challenge_sig) {
            return Err(SessionError::HandshakeFailed("challenge response verification failed".into()));
        }

        let session_key = self.agree()?;
        self.session_key = Some(session_key);

        let token = random_bytes_32();
        self.confirmation_token = Some(token.to_vec());

        let mut msg = self.base_envelope();
        msg.confirmation_token = Some(b64(&token));
        msg.sign_with(&self.local_ed25519_seed)?;
        self.state = SessionState::Established;
        Ok(msg)
    }

    /// Step 4→5 (initiator): verifies `session_established`, derives the
    /// matching session key, and echoes the token in `session_confirm`.
    /// `AckReceived -> Established`.
    pub fn on_established(&mut self, msg: &HandshakeEnvelope) -> Result<HandshakeEnvelope, SessionError> {
        self.require_state(SessionState::AckReceived)?;
        let peer_ed25519 = self
            .peer_ed25519_public
            .ok_or_else(|| SessionError::HandshakeFailed("peer key not learned".into()))?;
        msg.verify_with(&b64(&peer_ed25519))?;

        let token = from_b64(
            msg.confirmation_token
                .as_deref()
                .ok_or_else(|| SessionError::HandshakeFailed("missing confirmation token".into()))?,
        )?;
        let session_key = self.agree()?;
        self.session_key = Some(session_key);
        self.confirmation_token = Some(token.clone());

        let mut reply = self.base_envelope();
        reply.confirmation_token = Some(b64(&token));
        reply.sign_with(&self.local_ed25519_seed)?;
        self.state = SessionState::Established;
        Ok(reply)
    }

    /// Step 5→6 (responder): verifies `session_confirm` echoes the issued
    /// token, then issues `ready`. `Established -> Confirmed`.
    pub fn on_confirm(&mut self, confirm: &HandshakeEnvelope) -> Result<HandshakeEnvelope, SessionError> {
        self.require_state(SessionState::Established)?;
        let peer_ed25519 = self
            .peer_ed25519_public
            .ok_or_else(|| SessionError::HandshakeFailed("peer key not learned".into()))?;
        confirm.verify_with(&b64(&peer_ed25519))?;

        let echoed = from_b64(
            confirm
                .confirmation_token
                .as_deref()
                .ok_or_else(|| SessionError::HandshakeFailed("missing confirmation token".into()))?,
        )?;
        let expected = self.confirmation_token.as_ref().ok_or_else(|| SessionError::HandshakeFailed("no token issued".into()))?;
        if &echoed != expected {
            return Err(SessionError::HandshakeFailed("confirmation token mismatch".into()));
        }

        let mut ready = self.base_envelope();
        ready.sign_with(&self.local_ed25519_seed)?;
        self.state = SessionState::Confirmed;
        Ok(ready)
    }

    /// Step 6 (initiator): verifies `ready` and completes the handshake.
    /// `Established -> Ready`.
    pub fn on_ready(&mut self, ready: &HandshakeEnvelope) -> Result<[u8; 32], SessionError> {
        self.require_state(SessionState::Established)?;
        let peer_ed25519 = self
            .peer_ed25519_public
            .ok_or_else(|| SessionError::HandshakeFailed("peer key not learned".into()))?;
        ready.verify_with(&b64(&peer_ed25519))?;
        self.state = SessionState::Ready;
        self.session_key.ok_or_else(|| SessionError::HandshakeFailed("session key not derived".into()))
    }

    /// Responder-side completion after sending `ready`: `Confirmed -> Ready`.
    pub fn finish_as_responder(&mut self) -> Result<[u8; 32], SessionError> {
        self.require_state(SessionState::Confirmed)?;
        self.state = SessionState::Ready;
        self.session_key.ok_or_else(|| SessionError::HandshakeFailed("session key not derived".into()))
    }

    /// Marks the handshake as failed, entering the absorbing `ERROR` state.
    pub fn abort(&mut self, _reason: &str) {
        self.state = SessionState::Error;
    }

    /// Forces `EXPIRED` if the handshake timeout has elapsed.
    pub fn check_timeout(&mut self) -> bool {
        if !self.state.is_terminal() && self.is_expired() {
            self.state = SessionState::Expired;
            true
        } else {
            false
        }
    }

    /// Consumes the ephemeral X25519 key pair against the peer's public key
    /// and derives the session key via salted HKDF: salt =
    /// SHA-256(session_id ∥ x25519_pubkeys ∥ ed25519_pubkeys).
    ///
    /// The key ordering within the salt is canonicalized by handshake role
    /// (initiator's keys first, then responder's), not by local/peer — a
    /// local/peer ordering would put each side's own keys first and the
    /// two sides would hash different byte strings for the same pair of
    /// keys, deriving different session keys despite identical ECDH IKM.
    fn agree(&mut self) -> Result<[u8; 32], SessionError> {
        let own_x25519 = self.local_x25519.take().ok_or_else(|| SessionError::HandshakeFailed("ephemeral key already consumed".into()))?;
        let peer_x25519 = self.peer_x25519_public.ok_or_else(|| SessionError::HandshakeFailed("peer x25519 key not learned".into()))?;
        let peer_ed25519 = self.peer_ed25519_public.ok_or_else(|| SessionError::HandshakeFailed("peer ed25519 key not learned".into()))?;
        let is_initiator = self.is_initiator.ok_or_else(|| SessionError::HandshakeFailed("handshake role not established".into()))?;

        let raw_ecdh = x25519_dalek::StaticSecret::from(own_x25519.secret_bytes())
            .diffie_hellman(&x25519_dalek::PublicKey::from(peer_x25519));

        let (initiator_x, responder_x) = if is_initiator { (self.local_x25519_public, peer_x25519) } else { (peer_x25519, self.local_x25519_public) };
        let (initiator_ed, responder_ed) = if is_initiator {
            (self.local_ed25519_public, peer_ed25519)
        } else {
            (peer_ed25519, self.local_ed25519_public)
        };

        let mut salt_input = Vec::new();
        salt_input.extend_from_slice(self.session_id.as_bytes());
        salt_input.extend_from_slice(&initiator_x);
        salt_input.extend_from_slice(&responder_x);
        salt_input.extend_from_slice(&initiator_ed);
        salt_input.extend_from_slice(&responder_ed);
        let salt = Sha256::digest(&salt_input);

        salted_hkdf(raw_ecdh.as_bytes(), &salt, SESSION_KEY_INFO).map_err(|e| SessionError::HandshakeFailed(e.to_string()))
    }
}

fn salted_hkdf(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<[u8; 32], a2a_crypto::CryptoError> {
    use hkdf::Hkdf;
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm)
        .map_err(|e| a2a_crypto::CryptoError::InvalidInput(e.to_string()))?;
    Ok(okm)
}
