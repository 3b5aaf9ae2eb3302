//! Bearer 検証 → IdentityContext を extensions に入れる
//!
//! 1 リクエストにつき 1 回の認証パス:
//! 1. CORS ヘッダを（成功・失敗に関係なく）全レスポンスに付ける
//! 2. OPTIONS (preflight) は即 200。`next` は呼ばない
//! 3. RoutePolicy で public と判定されたら検証せずに `next`
//! 4. `Authorization: Bearer <token>` を取り出し、設定された verifier で検証
//! 5. 成功: IdentityContext を extensions に格納 → ロール判定 → `next`
//! 6. 失敗: 401 / 403 / 500 を `{"error": ...}` で返し、チェーンを止める
//!
//! 共有するのは不変の RoutePolicy / CorsPolicy / verifier だけ。リクエスト間で状態は持たない。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use futures::FutureExt;

use crate::api::v1::extractors::IdentityContext;
use crate::middleware::auth::{bearer, guard};
use crate::middleware::cors::CorsPolicy;
use crate::middleware::http::panic_message;
use crate::services::auth::{
    AuthError, CredentialVerifier, RouteClass, RoutePolicy, VerificationError,
};

/// The single request interceptor for authentication.
///
/// `verifier == None` is the explicit "authentication disabled" mode: CORS and the
/// preflight short-circuit still run, but every request reaches `next` without identity.
#[derive(Clone)]
pub struct AuthenticationMiddleware {
    policy: Arc<RoutePolicy>,
    cors: Arc<CorsPolicy>,
    verifier: Option<Arc<dyn CredentialVerifier>>,
}

impl std::fmt::Debug for AuthenticationMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationMiddleware")
            .field("policy", &self.policy)
            .field("cors", &self.cors)
            .field("scheme", &self.verifier.as_ref().map(|v| v.scheme()))
            .finish()
    }
}

impl AuthenticationMiddleware {
    pub fn new(
        policy: RoutePolicy,
        cors: CorsPolicy,
        verifier: Option<Arc<dyn CredentialVerifier>>,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            cors: Arc::new(cors),
            verifier,
        }
    }

    pub fn verifier(&self) -> Option<&dyn CredentialVerifier> {
        self.verifier.as_deref()
    }

    /// Run the whole pass for one request, CORS included.
    ///
    /// A panic in the verifier (or further down the chain) becomes
    /// `VerifierUnavailable` here, so the 500 still carries CORS headers.
    pub async fn handle(&self, req: Request<Body>, next: Next) -> Response {
        let origin = req.headers().get(header::ORIGIN).cloned();

        let mut res = match AssertUnwindSafe(self.authenticate(req, next))
            .catch_unwind()
            .await
        {
            Ok(res) => res,
            Err(panic) => {
                tracing::error!(panic = %panic_message(&*panic), "authentication pass panicked");
                AuthError::VerifierUnavailable.into_response()
            }
        };
        self.cors.apply(origin.as_ref(), res.headers_mut());
        res
    }

    async fn authenticate(&self, mut req: Request<Body>, next: Next) -> Response {
        // Browsers send preflight without credentials; answer before anything else.
        if req.method() == Method::OPTIONS {
            return StatusCode::OK.into_response();
        }

        let Some(verifier) = self.verifier.as_deref() else {
            return next.run(req).await;
        };

        let required_roles = match self.policy.classify(req.method(), req.uri().path()) {
            RouteClass::Public => return next.run(req).await,
            RouteClass::Protected { required_roles } => required_roles,
        };

        let identity = match verify_headers(verifier, req.headers()).await {
            Ok(identity) => identity,
            Err(err) => {
                tracing::debug!(
                    code = err.code(),
                    method = %req.method(),
                    path = %req.uri().path(),
                    "request rejected"
                );
                return err.into_response();
            }
        };

        if let Err(err) = guard::authorize(&identity, &required_roles) {
            tracing::warn!(
                subject = %identity.subject,
                role = %identity.role,
                required = ?required_roles,
                path = %req.uri().path(),
                "insufficient role"
            );
            return err.into_response();
        }

        // middleware → extractor への受け渡し
        req.extensions_mut().insert(identity);

        next.run(req).await
    }
}

/// Extract + verify the bearer credential carried by `headers`.
pub async fn verify_headers(
    verifier: &dyn CredentialVerifier,
    headers: &HeaderMap,
) -> Result<IdentityContext, AuthError> {
    let token = bearer::bearer_token(headers)?;

    match verifier.verify(token).await {
        Ok(claims) => Ok(IdentityContext::from_claims(&claims, token)),
        Err(err) => {
            let fp = bearer::token_fingerprint(token);
            match &err {
                VerificationError::Unavailable(_) => tracing::error!(
                    scheme = verifier.scheme(),
                    token_fp = %fp,
                    error = %err,
                    "credential verifier failed"
                ),
                _ => tracing::warn!(
                    scheme = verifier.scheme(),
                    token_fp = %fp,
                    error = %err,
                    "credential verification failed"
                ),
            }
            Err(err.into())
        }
    }
}

/// Put the authentication middleware in front of every route of `router`
/// (the fallback included, so unknown paths still get CORS and a 401).
///
/// 例：
/// ```ignore
/// let app = Router::new().nest("/api/v1", api::v1::routes(&state)).with_state(state.clone());
/// let app = middleware::auth::access::apply(app, state.auth.clone());
/// ```
pub fn apply<S>(router: Router<S>, auth: AuthenticationMiddleware) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(auth, access_middleware))
}

async fn access_middleware(
    State(auth): State<AuthenticationMiddleware>,
    req: Request<Body>,
    next: Next,
) -> Response {
    auth.handle(req, next).await
}
