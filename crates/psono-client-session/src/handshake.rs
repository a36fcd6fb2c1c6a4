//! Login handshake.
//!
//! ```text
//! Init -> AssertionBuilt -> Sent -> ResponseReceived -> SignatureVerified -> SessionEstablished
//!   \________________________________ any error ________________________________/-> Failed
//! ```
//!
//! Each run generates a fresh ephemeral box key pair. The pair is consumed
//! when the server's login info is opened, so a failed run can only be
//! retried from scratch with new keys. The server signature is checked over
//! the decrypted login info; a response that decrypts but does not verify is
//! discarded.

use serde::Serialize;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use psono_client_core::{
    encoding, BoxPublicKey, EphemeralKeyPair, Nonce, Signature, SigningKeypair,
};

use crate::codec::SessionContext;
use crate::config::ClientConfig;
use crate::error::{Result, SessionError};
use crate::messages::{paths, LoginRequest, ServerLoginEnvelope, ServerLoginInfo};
use crate::policy::ApiKeyScope;
use crate::transport::{ApiRequest, Transport};

/// The claim sent to the server at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAssertion {
    /// Identifier of the API key logging in.
    pub api_key_id: String,
    /// Public half of this attempt's ephemeral box key pair.
    pub session_public_key: BoxPublicKey,
    /// Free-form label the server shows for the session.
    pub device_description: String,
}

/// Field order of the signed text is fixed.
#[derive(Serialize)]
struct AssertionText<'a> {
    api_key_id: &'a str,
    session_public_key: String,
    device_description: &'a str,
}

impl LoginAssertion {
    /// Create an assertion for `api_key_id` offering `session_public_key`.
    pub fn new(
        api_key_id: impl Into<String>,
        session_public_key: BoxPublicKey,
        device_description: impl Into<String>,
    ) -> Self {
        Self {
            api_key_id: api_key_id.into(),
            session_public_key,
            device_description: device_description.into(),
        }
    }

    /// Compact JSON text that gets signed and sent verbatim.
    pub fn canonical_json(&self) -> Result<String> {
        let text = AssertionText {
            api_key_id: &self.api_key_id,
            session_public_key: self.session_public_key.to_hex(),
            device_description: &self.device_description,
        };
        Ok(serde_json::to_string(&text)?)
    }

    /// Sign the canonical text with the API key's signing key.
    pub fn sign(&self, key: &SigningKeypair) -> Result<SignedAssertion> {
        let info = self.canonical_json()?;
        let signature = key.sign(info.as_bytes());
        Ok(SignedAssertion { info, signature })
    }
}

/// A login assertion together with its detached signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAssertion {
    /// The exact text that was signed.
    pub info: String,
    pub signature: Signature,
}

impl SignedAssertion {
    /// The login request body.
    pub fn to_request(&self) -> LoginRequest {
        LoginRequest {
            info: self.info.clone(),
            signature: self.signature.to_hex(),
        }
    }
}

/// Why a handshake ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Transport,
    DecryptionFailed,
    AuthenticationFailed,
    MalformedResponse,
}

impl From<&SessionError> for FailureReason {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::DecryptionFailed => FailureReason::DecryptionFailed,
            SessionError::AuthenticationFailed(_) => FailureReason::AuthenticationFailed,
            SessionError::TransportError(_) | SessionError::HttpStatus { .. } => {
                FailureReason::Transport
            }
            _ => FailureReason::MalformedResponse,
        }
    }
}

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Init,
    AssertionBuilt,
    Sent,
    ResponseReceived,
    SignatureVerified,
    SessionEstablished,
    Failed(FailureReason),
}

/// The output of a successful handshake.
#[derive(Debug)]
pub struct EstablishedSession {
    pub context: SessionContext,
    pub login_info: ServerLoginInfo,
}

impl EstablishedSession {
    /// The scope granted to the API key.
    pub fn scope(&self) -> ApiKeyScope {
        self.login_info.scope()
    }
}

/// Drives one login.
#[derive(Debug)]
pub struct Handshake<'a> {
    config: &'a ClientConfig,
    state: HandshakeState,
}

impl<'a> Handshake<'a> {
    /// Create a handshake for `config`, in state `Init`.
    pub fn new(config: &'a ClientConfig) -> Self {
        Self {
            config,
            state: HandshakeState::Init,
        }
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Run the handshake to completion.
    ///
    /// May be called again after a failure; each attempt starts over from
    /// `Init` with a fresh key pair.
    pub async fn run<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<EstablishedSession> {
        if self.state == HandshakeState::SessionEstablished {
            return Err(SessionError::HandshakeComplete);
        }
        self.state = HandshakeState::Init;

        match self.attempt(transport).await {
            Ok(session) => Ok(session),
            Err(err) => {
                let reason = FailureReason::from(&err);
                warn!(from = ?self.state, ?reason, "handshake failed");
                self.state = HandshakeState::Failed(reason);
                Err(err)
            }
        }
    }

    async fn attempt<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<EstablishedSession> {
        let keypair = EphemeralKeyPair::generate();
        let signed = LoginAssertion::new(
            self.config.api_key_id.as_str(),
            keypair.public_key(),
            self.config.device_description.as_str(),
        )
        .sign(&self.config.api_key_signing_key)?;
        self.transition(HandshakeState::AssertionBuilt);

        let request = ApiRequest::post(paths::LOGIN).with_json(&signed.to_request())?;
        self.transition(HandshakeState::Sent);
        let response = transport.request(request).await?;
        let envelope: ServerLoginEnvelope = serde_json::from_value(response)
            .map_err(|e| SessionError::MalformedResponse(format!("login response: {e}")))?;
        self.transition(HandshakeState::ResponseReceived);

        let plaintext = self.open(keypair, &envelope)?;
        self.transition(HandshakeState::SignatureVerified);

        let login_info: ServerLoginInfo = serde_json::from_slice(&plaintext)
            .map_err(|e| SessionError::MalformedResponse(format!("login info: {e}")))?;
        let context = SessionContext::new(
            login_info.token.as_str(),
            login_info.session_secret_key.clone(),
        );
        self.transition(HandshakeState::SessionEstablished);

        Ok(EstablishedSession {
            context,
            login_info,
        })
    }

    /// Decrypt the login info, then verify the server's signature over it.
    fn open(
        &self,
        keypair: EphemeralKeyPair,
        envelope: &ServerLoginEnvelope,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let malformed = |field: &str, e: psono_client_core::CoreError| {
            SessionError::MalformedResponse(format!("{field}: {e}"))
        };
        let ciphertext = encoding::decode(&envelope.login_info).map_err(|e| malformed("login_info", e))?;
        let nonce = Nonce::from_hex(&envelope.login_info_nonce)
            .map_err(|e| malformed("login_info_nonce", e))?;
        let server_session_key = BoxPublicKey::from_hex(&envelope.server_session_public_key)
            .map_err(|e| malformed("server_session_public_key", e))?;

        let plaintext = keypair
            .open(&ciphertext, &nonce, &server_session_key)
            .map(Zeroizing::new)
            .map_err(|_| SessionError::DecryptionFailed)?;

        let signature = Signature::from_hex(&envelope.login_info_signature).map_err(|_| {
            SessionError::AuthenticationFailed("login info signature is not a valid signature".into())
        })?;
        self.config
            .server_verify_key
            .verify(&plaintext, &signature)
            .map_err(|_| {
                SessionError::AuthenticationFailed(
                    "server signature does not match the login info".into(),
                )
            })?;

        Ok(plaintext)
    }

    fn transition(&mut self, next: HandshakeState) {
        debug!(from = ?self.state, to = ?next, "handshake transition");
        self.state = next;
    }
}

/// Log in with `config` over `transport`.
pub async fn login<T: Transport + ?Sized>(
    config: &ClientConfig,
    transport: &T,
) -> Result<EstablishedSession> {
    Handshake::new(config).run(transport).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::ScriptedTransport;
    use psono_client_core::{box_encrypt, BoxSecretKey, SecretBoxKey, VerifyKey};
    use serde_json::{json, Value};

    struct Server {
        signing: SigningKeypair,
        api_key: VerifyKey,
    }

    /// How the simulated server mangles its answer.
    #[derive(Clone, Copy)]
    enum Reply {
        Honest,
        ForgedSignature,
        SignCiphertext,
        WrongBoxKey,
    }

    impl Server {
        fn respond(&self, request: &ApiRequest, reply: Reply, info: &Value) -> Result<Value> {
            let login: LoginRequest = serde_json::from_value(request.body.clone().unwrap()).unwrap();
            let signature = Signature::from_hex(&login.signature).unwrap();
            self.api_key.verify(login.info.as_bytes(), &signature).unwrap();

            let assertion: Value = serde_json::from_str(&login.info).unwrap();
            let client_key =
                BoxPublicKey::from_hex(assertion["session_public_key"].as_str().unwrap()).unwrap();

            let server_session = BoxSecretKey::generate();
            let recipient = match reply {
                Reply::WrongBoxKey => BoxSecretKey::generate().public_key(),
                _ => client_key,
            };
            let plaintext = info.to_string();
            let nonce = Nonce::generate();
            let ciphertext =
                box_encrypt(plaintext.as_bytes(), &nonce, &recipient, &server_session).unwrap();

            let signature = match reply {
                Reply::ForgedSignature => SigningKeypair::generate().sign(plaintext.as_bytes()),
                Reply::SignCiphertext => self.signing.sign(encoding::encode(&ciphertext).as_bytes()),
                _ => self.signing.sign(plaintext.as_bytes()),
            };

            Ok(json!({
                "login_info": encoding::encode(&ciphertext),
                "login_info_nonce": nonce.to_hex(),
                "login_info_signature": signature.to_hex(),
                "server_session_public_key": server_session.public_key().to_hex(),
            }))
        }
    }

    fn setup() -> (ClientConfig, Server) {
        let api_key = SigningKeypair::generate();
        let server = SigningKeypair::generate();
        let config = ClientConfig::new(
            "https://psono.test",
            "key-1",
            api_key.clone(),
            SecretBoxKey::generate(),
            server.verify_key(),
        )
        .with_device_description("unit test");
        let server = Server {
            api_key: api_key.verify_key(),
            signing: server,
        };
        (config, server)
    }

    fn login_info(session_key: &SecretBoxKey) -> Value {
        json!({
            "token": "t-123",
            "session_secret_key": session_key.to_hex(),
            "api_key_read": true,
            "api_key_write": true,
            "api_key_restrict_to_secrets": false,
            "user": { "secret_key": "aa", "secret_key_nonce": "bb" },
        })
    }

    fn script(server: Server, reply: Reply, info: Value) -> ScriptedTransport {
        let transport = ScriptedTransport::new();
        transport.push_handler(move |req| server.respond(req, reply, &info));
        transport
    }

    #[test]
    fn test_canonical_json_field_order() {
        let key = BoxPublicKey::from_bytes([1u8; 32]);
        let assertion = LoginAssertion::new("id-1", key, "Console Client host");
        assert_eq!(
            assertion.canonical_json().unwrap(),
            format!(
                r#"{{"api_key_id":"id-1","session_public_key":"{}","device_description":"Console Client host"}}"#,
                "01".repeat(32)
            )
        );
    }

    #[test]
    fn test_signed_assertion_verifies() {
        let signing = SigningKeypair::generate();
        let assertion = LoginAssertion::new("id", BoxPublicKey::from_bytes([2u8; 32]), "d");
        let request = assertion.sign(&signing).unwrap().to_request();
        assert_eq!(request.signature.len(), 128);

        let signature = Signature::from_hex(&request.signature).unwrap();
        assert!(signing.verify_key().verify(request.info.as_bytes(), &signature).is_ok());
    }

    #[tokio::test]
    async fn test_successful_handshake() {
        let (config, server) = setup();
        let session_key = SecretBoxKey::generate();
        let transport = script(server, Reply::Honest, login_info(&session_key));

        let mut handshake = Handshake::new(&config);
        assert_eq!(handshake.state(), HandshakeState::Init);
        let session = handshake.run(&transport).await.unwrap();

        assert_eq!(handshake.state(), HandshakeState::SessionEstablished);
        assert_eq!(session.context.token(), "t-123");
        assert_eq!(session.login_info.session_secret_key, session_key);
        assert!(session.scope().write);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, paths::LOGIN);
        assert!(requests[0].token.is_none());
    }

    #[tokio::test]
    async fn test_rerun_after_success_rejected() {
        let (config, server) = setup();
        let transport = script(server, Reply::Honest, login_info(&SecretBoxKey::generate()));

        let mut handshake = Handshake::new(&config);
        handshake.run(&transport).await.unwrap();
        let err = handshake.run(&transport).await.unwrap_err();
        assert!(matches!(err, SessionError::HandshakeComplete));
    }

    #[tokio::test]
    async fn test_forged_signature_rejected() {
        let (config, server) = setup();
        let transport = script(server, Reply::ForgedSignature, login_info(&SecretBoxKey::generate()));

        let mut handshake = Handshake::new(&config);
        let err = handshake.run(&transport).await.unwrap_err();
        assert!(matches!(err, SessionError::AuthenticationFailed(_)));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(FailureReason::AuthenticationFailed)
        );
    }

    #[tokio::test]
    async fn test_signature_over_ciphertext_rejected() {
        let (config, server) = setup();
        let transport = script(server, Reply::SignCiphertext, login_info(&SecretBoxKey::generate()));

        let err = login(&config, &transport).await.unwrap_err();
        assert!(matches!(err, SessionError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn test_box_for_other_key_fails_decryption() {
        let (config, server) = setup();
        let transport = script(server, Reply::WrongBoxKey, login_info(&SecretBoxKey::generate()));

        let mut handshake = Handshake::new(&config);
        let err = handshake.run(&transport).await.unwrap_err();
        assert!(matches!(err, SessionError::DecryptionFailed));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(FailureReason::DecryptionFailed)
        );
    }

    #[tokio::test]
    async fn test_retry_uses_fresh_key_pair() {
        let (config, server) = setup();
        let transport = ScriptedTransport::new();
        transport.push_response(json!({ "detail": "not an envelope" }));
        let info = login_info(&SecretBoxKey::generate());
        transport.push_handler(move |req| server.respond(req, Reply::Honest, &info));

        let mut handshake = Handshake::new(&config);
        let err = handshake.run(&transport).await.unwrap_err();
        assert!(matches!(err, SessionError::MalformedResponse(_)));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(FailureReason::MalformedResponse)
        );

        handshake.run(&transport).await.unwrap();

        let keys: Vec<String> = transport
            .requests()
            .iter()
            .map(|r| {
                let login: LoginRequest = serde_json::from_value(r.body.clone().unwrap()).unwrap();
                let info: Value = serde_json::from_str(&login.info).unwrap();
                info["session_public_key"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let (config, _) = setup();
        let transport = ScriptedTransport::new();

        let mut handshake = Handshake::new(&config);
        let err = handshake.run(&transport).await.unwrap_err();
        assert!(matches!(err, SessionError::TransportError(_)));
        assert_eq!(
            handshake.state(),
            HandshakeState::Failed(FailureReason::Transport)
        );
    }

    #[tokio::test]
    async fn test_restricted_key_handshake_still_succeeds() {
        let (config, server) = setup();
        let session_key = SecretBoxKey::generate();
        let info = json!({
            "token": "t",
            "session_secret_key": session_key.to_hex(),
            "api_key_read": true,
            "api_key_write": false,
            "api_key_restrict_to_secrets": true,
        });
        let transport = script(server, Reply::Honest, info);

        let session = login(&config, &transport).await.unwrap();
        assert!(session.scope().restrict_to_secrets);
        assert!(session.login_info.user.is_none());
    }
}
