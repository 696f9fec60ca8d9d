//! [`Command`] for authorizing a user [`Session`].

use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a user [`Session`].
///
/// Users are managed by an external identity provider, so the [`Session`]
/// is trusted once its token signature and expiration are valid.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        let AuthorizeUserSession { token } = cmd;

        Ok(jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> ExecutionError))?
        .claims)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use jsonwebtoken::{EncodingKey, Header};

    use crate::{
        command::Command as _,
        domain::user::{self, session, Session},
        infra::Memory,
        Config, Service,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    const SECRET: &[u8] = b"test-secret";

    fn service() -> Service<Memory> {
        Service::new(Config::new(SECRET, Default::default()), Memory::new()).0
    }

    fn token(session: &Session, secret: &[u8]) -> session::Token {
        session::Token::new(
            jsonwebtoken::encode(
                &Header::default(),
                session,
                &EncodingKey::from_secret(secret),
            )
            .unwrap(),
        )
    }

    fn session(expires_in: Duration, role: user::Role) -> Session {
        Session {
            user_id: user::Id::new(),
            role,
            expires_at: session::ExpirationDateTime::now() + expires_in,
        }
    }

    #[tokio::test]
    async fn authorizes_valid_token() {
        let svc = service();
        let expected = session(Duration::from_secs(3600), user::Role::Admin);

        let actual = svc
            .execute(AuthorizeUserSession {
                token: token(&expected, SECRET),
            })
            .await
            .unwrap();

        assert_eq!(actual.user_id, expected.user_id);
        assert_eq!(actual.role, user::Role::Admin);
        assert_eq!(
            actual.expires_at.unix_timestamp(),
            expected.expires_at.unix_timestamp(),
        );
    }

    #[tokio::test]
    async fn rejects_foreign_signature() {
        let svc = service();
        let s = session(Duration::from_secs(3600), user::Role::Client);

        let err = svc
            .execute(AuthorizeUserSession {
                token: token(&s, b"another-secret"),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let svc = service();
        let mut s = session(Duration::ZERO, user::Role::Client);
        s.expires_at = s.expires_at - Duration::from_secs(3600);

        assert!(svc
            .execute(AuthorizeUserSession {
                token: token(&s, SECRET),
            })
            .await
            .is_err());
    }
}
