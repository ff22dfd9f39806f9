use std::env;

use cached::proc_macro::cached;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use lambda_runtime::{Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

pub static POLICY_VERSION: &str = "2012-10-17";

const USER_POOL_ID: &str = "USER_POOL_ID";
const APP_CLIENT_ID: &str = "APP_CLIENT_ID";
const AWS_REGION: &str = "AWS_REGION";

/// API Gateway answers 401 only for this exact error message.
const UNAUTHORIZED: &str = "Unauthorized";

fn issuer(region: &str, user_pool_id: &str) -> String {
    format!("https://cognito-idp.{}.amazonaws.com/{}", region, user_pool_id)
}

// Cognito rotates keys rarely; an hour keeps warm containers off the network.
#[cached(time = 3600, result = true)]
async fn fetch_jwks(issuer: String) -> Result<JwkSet, Error> {
    let url = format!("{}/.well-known/jwks.json", issuer);
    info!("fetching signing keys from {}", url);
    let jwks = reqwest::get(url).await?.error_for_status()?.json::<JwkSet>().await?;
    Ok(jwks)
}

async fn decoding_key(issuer: &str, kid: &str) -> Result<DecodingKey, Error> {
    let jwks = fetch_jwks(issuer.to_string()).await?;
    let jwk = jwks.find(kid).ok_or_else(|| format!("unknown key id {}", kid))?;
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => Ok(DecodingKey::from_rsa_components(&rsa.n, &rsa.e)?),
        _ => Err(Error::from("signing key is not an RSA key")),
    }
}

pub async fn authorize(event: LambdaEvent<APIGatewayCustomAuthorizerRequest>) -> Result<APIGatewayCustomAuthorizerResponse, Error> {
    let request = event.payload;
    debug!("authorize request for {}", request.method_arn);
    match verify(&request).await {
        Ok(response) => Ok(response),
        Err(e) => {
            warn!("rejecting token: {}", e);
            Err(Error::from(UNAUTHORIZED))
        }
    }
}

async fn verify(request: &APIGatewayCustomAuthorizerRequest) -> Result<APIGatewayCustomAuthorizerResponse, Error> {
    let token = request
        .authorization_token
        .strip_prefix("Bearer ")
        .ok_or("invalid authorization token")?;
    let user_pool_id = env::var(USER_POOL_ID)?;
    let region = env::var(AWS_REGION)?;
    let app_client_id = env::var(APP_CLIENT_ID).ok();
    let issuer = issuer(&region, &user_pool_id);

    let header = jsonwebtoken::decode_header(token)?;
    let key = decoding_key(&issuer, &header.kid.ok_or("no 'kid' in header")?).await?;
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer.as_str()]);
    let token_data = jsonwebtoken::decode::<CognitoClaims>(token, &key, &validation)?;
    check_claims(&token_data.claims, app_client_id.as_deref())?;

    let arn = MethodArn::parse(&request.method_arn)?;
    let policy_document = APIGatewayPolicyBuilder::new(&arn.region, &arn.aws_account_id, &arn.rest_api_id, &arn.stage)
        .allow_all_methods()
        .build();
    let claims = token_data.claims;
    info!("authorized {} with groups {:?}", claims.sub, claims.groups);
    Ok(APIGatewayCustomAuthorizerResponse {
        principal_id: claims.sub.to_owned(),
        policy_document,
        context: claims.context(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitoClaims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,
    pub token_use: String,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl CognitoClaims {
    /// Authorizer context values must be primitives, so groups travel as a
    /// comma separated string.
    pub fn context(&self) -> Value {
        let mut context_map = Map::with_capacity(4);
        context_map.insert("sub".to_string(), Value::String(self.sub.to_owned()));
        context_map.insert("exp".to_string(), Value::String(self.exp.to_string()));
        context_map.insert("groups".to_string(), Value::String(self.groups.join(",")));
        if let Some(email) = &self.email {
            context_map.insert("email".to_string(), Value::String(email.to_owned()));
        }
        Value::Object(context_map)
    }
}

/// Cognito id tokens carry the app client in `aud`, access tokens in
/// `client_id`.
pub fn check_claims(claims: &CognitoClaims, app_client_id: Option<&str>) -> Result<(), Error> {
    let client = match claims.token_use.as_str() {
        "id" => claims.aud.as_deref(),
        "access" => claims.client_id.as_deref(),
        other => return Err(Error::from(format!("unexpected token_use {}", other))),
    };
    match app_client_id {
        Some(expected) if client != Some(expected) => Err(Error::from("token issued for another app client")),
        _ => Ok(()),
    }
}

/// `arn:aws:execute-api:{region}:{account}:{api}/{stage}/{method}/{resource}`
#[derive(Debug, PartialEq, Eq)]
pub struct MethodArn {
    pub region: String,
    pub aws_account_id: String,
    pub rest_api_id: String,
    pub stage: String,
}

impl MethodArn {
    pub fn parse(arn: &str) -> Result<MethodArn, Error> {
        let tmp: Vec<&str> = arn.splitn(6, ':').collect();
        if tmp.len() != 6 || tmp[2] != "execute-api" {
            return Err(Error::from(format!("not an execute-api arn: {}", arn)));
        }
        let api_gateway_arn_tmp: Vec<&str> = tmp[5].split('/').collect();
        if api_gateway_arn_tmp.len() < 2 {
            return Err(Error::from(format!("arn without stage: {}", arn)));
        }
        Ok(MethodArn {
            region: tmp[3].to_string(),
            aws_account_id: tmp[4].to_string(),
            rest_api_id: api_gateway_arn_tmp[0].to_string(),
            stage: api_gateway_arn_tmp[1].to_string(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct APIGatewayCustomAuthorizerRequest {
    #[serde(rename = "type")]
    _type: String,
    authorization_token: String,
    method_arn: String
}

#[derive(Debug, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct APIGatewayCustomAuthorizerPolicy {
    Version: String,
    Statement: Vec<IAMPolicyStatement>
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct APIGatewayCustomAuthorizerResponse {
    principal_id: String,
    policy_document: APIGatewayCustomAuthorizerPolicy,
    context: serde_json::Value
}

#[derive(Debug, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct IAMPolicyStatement {
    Action: Vec<String>,
    Effect: Effect,
    Resource: Vec<String>
}

#[derive(Debug)]
pub struct APIGatewayPolicyBuilder {
    region: String,
    aws_account_id: String,
    rest_api_id: String,
    stage: String,
    policy: APIGatewayCustomAuthorizerPolicy
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny
}

impl APIGatewayPolicyBuilder {
    pub fn new(
        region: &str,
        account_id: &str,
        api_id: &str,
        stage: &str,
    ) -> APIGatewayPolicyBuilder {
        Self {
            region: region.to_string(),
            aws_account_id: account_id.to_string(),
            rest_api_id: api_id.to_string(),
            stage: stage.to_string(),
            policy: APIGatewayCustomAuthorizerPolicy {
                Version: POLICY_VERSION.to_string(),
                Statement: vec![],
            },
        }
    }

    pub fn add_method_arn(mut self, effect: Effect, resource_arn: String) -> Self {
        let stmt = IAMPolicyStatement {
            Effect: effect,
            Action: vec!["execute-api:Invoke".to_string()],
            Resource: vec![resource_arn],
        };

        self.policy.Statement.push(stmt);
        self
    }

    /// `method` is an HTTP verb or `*`.
    pub fn add_method<T: Into<String>>(
        self,
        effect: Effect,
        method: &str,
        resource: T,
    ) -> Self {
        let resource_arn = format!(
            "arn:aws:execute-api:{}:{}:{}/{}/{}/{}",
            &self.region,
            &self.aws_account_id,
            &self.rest_api_id,
            &self.stage,
            method,
            resource.into().trim_start_matches('/')
        );
        self.add_method_arn(effect, resource_arn)
    }

    /// The authorizer result is cached per token, so it has to cover every
    /// route; handlers do the fine-grained permission checks.
    pub fn allow_all_methods(self) -> Self {
        self.add_method(Effect::Allow, "*", "*")
    }

    pub fn build(self) -> APIGatewayCustomAuthorizerPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use club_common::Principal;
    use std::collections::HashMap;

    fn claims(token_use: &str) -> CognitoClaims {
        CognitoClaims {
            sub: "4e2967ee-a207-4a00-9a31-4a60443d5e96".to_string(),
            exp: 1677300937,
            email: Some("rider@example.org".to_string()),
            groups: vec!["Club_Members".to_string(), "Regio_Utrecht".to_string()],
            token_use: token_use.to_string(),
            aud: Some("client-a".to_string()),
            client_id: Some("client-b".to_string()),
        }
    }

    #[test]
    fn test_method_arn() {
        let arn = MethodArn::parse("arn:aws:execute-api:eu-west-1:123456789012:abcdef1234/prod/GET/members/42").unwrap();
        assert_eq!(arn, MethodArn {
            region: "eu-west-1".to_string(),
            aws_account_id: "123456789012".to_string(),
            rest_api_id: "abcdef1234".to_string(),
            stage: "prod".to_string(),
        });
        assert!(MethodArn::parse("arn:aws:s3:::bucket").is_err());
        assert!(MethodArn::parse("arn:aws:execute-api:eu-west-1:123456789012:abcdef1234").is_err());
    }

    #[test]
    fn test_policy_builder() {
        let policy = APIGatewayPolicyBuilder::new("eu-west-1", "123456789012", "abcdef1234", "prod")
            .allow_all_methods()
            .add_method(Effect::Deny, "PUT", "/members")
            .build();
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["Version"], POLICY_VERSION);
        assert_eq!(json["Statement"][0]["Effect"], "Allow");
        assert_eq!(json["Statement"][0]["Action"][0], "execute-api:Invoke");
        assert_eq!(json["Statement"][0]["Resource"][0], "arn:aws:execute-api:eu-west-1:123456789012:abcdef1234/prod/*/*");
        assert_eq!(json["Statement"][1]["Effect"], "Deny");
        assert_eq!(json["Statement"][1]["Resource"][0], "arn:aws:execute-api:eu-west-1:123456789012:abcdef1234/prod/PUT/members");
    }

    #[test]
    fn test_check_claims() {
        assert!(check_claims(&claims("id"), Some("client-a")).is_ok());
        assert!(check_claims(&claims("id"), Some("client-b")).is_err());
        assert!(check_claims(&claims("access"), Some("client-b")).is_ok());
        assert!(check_claims(&claims("refresh"), None).is_err());
        assert!(check_claims(&claims("id"), None).is_ok());
    }

    #[test]
    fn test_context_is_read_back_by_handlers() {
        let context: HashMap<String, Value> = serde_json::from_value(claims("id").context()).unwrap();
        let principal = Principal::from_authorizer(&context).unwrap();
        assert_eq!(principal.sub, "4e2967ee-a207-4a00-9a31-4a60443d5e96");
        assert_eq!(principal.groups, vec!["Club_Members", "Regio_Utrecht"]);
        assert_eq!(principal.email.as_deref(), Some("rider@example.org"));
    }

    #[test]
    fn test_claims_from_cognito_payload() {
        let parsed: CognitoClaims = serde_json::from_value(serde_json::json!({
            "sub": "abc",
            "exp": 1,
            "token_use": "access",
            "client_id": "client-b",
            "scope": "aws.cognito.signin.user.admin",
            "cognito:groups": ["Finance"]
        }))
        .unwrap();
        assert_eq!(parsed.groups, vec!["Finance"]);
        assert_eq!(parsed.email, None);
    }
}
