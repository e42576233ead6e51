use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use tracing::debug;

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::{actor::Actor, role::Role};

/// Caller identity taken from the `Authorization: Bearer` token.
pub struct AuthUser {
    pub user_id: u64,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "Rejected bearer token");
                return ready(Err(ErrorUnauthorized("Invalid token")));
            }
        };

        let role = match Role::from_id(claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            user_id: claims.user_id,
            role,
        }))
    }
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}
