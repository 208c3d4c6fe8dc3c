use async_trait::async_trait;

use super::graph::DescriptorError;

/// Account and region the stack is deployed into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub account_id: String,
    pub region: String,
}

/// Read-only lookups against the credential context.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn resolve(&self) -> Result<CallerContext, DescriptorError>;
}

/// Resolves the caller through STS and the region from the shared AWS config.
pub struct StsIdentity {
    client: aws_sdk_sts::Client,
    region: Option<String>,
}

impl StsIdentity {
    pub async fn from_env() -> Self {
        Self::new(None).await
    }

    /// Loads the shared AWS config; an explicit `region` wins over the
    /// environment and profile, for both the STS endpoint and the result.
    pub async fn new(region: Option<String>) -> Self {
        let mut loader = aws_config::from_env();
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;

        Self {
            client: aws_sdk_sts::Client::new(&config),
            region: config.region().map(|region| region.to_string()),
        }
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

#[async_trait]
impl IdentityLookup for StsIdentity {
    async fn resolve(&self) -> Result<CallerContext, DescriptorError> {
        let region = self
            .region
            .clone()
            .ok_or_else(|| DescriptorError::Lookup("no AWS region configured".to_string()))?;

        let output = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| DescriptorError::Lookup(format!("GetCallerIdentity: {e}")))?;

        let account_id = output
            .account()
            .ok_or_else(|| DescriptorError::Lookup("caller identity has no account".to_string()))?
            .to_string();

        tracing::debug!(account_id = %account_id, region = %region, "Resolved caller context");

        Ok(CallerContext { account_id, region })
    }
}

/// Fixed answer, used for explicit overrides and in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity(pub CallerContext);

#[async_trait]
impl IdentityLookup for StaticIdentity {
    async fn resolve(&self) -> Result<CallerContext, DescriptorError> {
        Ok(self.0.clone())
    }
}

/// Account and region given on the command line. When both are set nothing is
/// looked up; otherwise STS fills the gaps, using `region` for the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerOverrides {
    pub account_id: Option<String>,
    pub region: Option<String>,
}

impl CallerOverrides {
    fn apply(&self, mut caller: CallerContext) -> CallerContext {
        if let Some(account_id) = &self.account_id {
            caller.account_id = account_id.clone();
        }
        if let Some(region) = &self.region {
            caller.region = region.clone();
        }
        caller
    }
}

#[async_trait]
impl IdentityLookup for CallerOverrides {
    async fn resolve(&self) -> Result<CallerContext, DescriptorError> {
        if let (Some(account_id), Some(region)) = (&self.account_id, &self.region) {
            return Ok(CallerContext {
                account_id: account_id.clone(),
                region: region.clone(),
            });
        }

        let caller = StsIdentity::new(self.region.clone()).await.resolve().await?;
        Ok(self.apply(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CallerContext {
        CallerContext {
            account_id: "123456789012".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_static_identity_returns_context() {
        let context = context();
        let lookup = StaticIdentity(context.clone());
        assert_eq!(lookup.resolve().await.unwrap(), context);
    }

    #[tokio::test]
    async fn test_full_overrides_skip_lookup() {
        let overrides = CallerOverrides {
            account_id: Some("210987654321".to_string()),
            region: Some("eu-west-1".to_string()),
        };

        assert_eq!(
            overrides.resolve().await.unwrap(),
            CallerContext {
                account_id: "210987654321".to_string(),
                region: "eu-west-1".to_string(),
            }
        );
    }

    #[test]
    fn test_partial_overrides_replace_looked_up_fields() {
        let region_only = CallerOverrides {
            account_id: None,
            region: Some("ap-south-1".to_string()),
        };
        let caller = region_only.apply(context());
        assert_eq!(caller.account_id, "123456789012");
        assert_eq!(caller.region, "ap-south-1");

        let account_only = CallerOverrides {
            account_id: Some("210987654321".to_string()),
            region: None,
        };
        let caller = account_only.apply(context());
        assert_eq!(caller.account_id, "210987654321");
        assert_eq!(caller.region, "us-east-1");
    }

    #[tokio::test]
    async fn test_region_override_reaches_sdk_config() {
        let identity = StsIdentity::new(Some("eu-central-1".to_string())).await;
        assert_eq!(identity.region(), Some("eu-central-1"));
    }
}
