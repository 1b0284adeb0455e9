//! Translates human-friendly service and client names into console ids.
//!
//! Services are matched by name across every page of the instance list,
//! exact match first, then case-insensitive. The matched instance also
//! decides how an export is scoped (see [`ServiceResolution`]) and how an
//! actor name is resolved (see [`ServiceFamily`]).

use crate::console_api::{ConsoleClient, Page};
use crate::error::{PipelineError, Result};
use crate::utils::validate::is_uuid;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info, warn};

pub const SERVICE_INSTANCES_PATH: &str = "/v1/service_instances";
/// Source token for data-platform services.
pub const DATA_PLATFORM_SOURCE: &str = "cdsp";
/// Prefix of synthesized HSM partition sources.
pub const HSM_SOURCE_PREFIX: &str = "thales/cloudhsm/";

const DATA_PLATFORM_SERVICE_TYPE: &str = "ctaas";
const PAGE_SIZE: u32 = 100;
const MAX_PAGES: u32 = 1000;

/// Service types that front an HSM partition without "hsm" in their name.
const HSM_SERVICE_TYPES: &[&str] = &[
    "key_vault",
    "hsm_key_export",
    "ms_sql_server",
    "java_code_sign",
    "ms_authenticode",
    "ms_adcs",
    "pki_private_key_protection",
    "digital_signing",
    "oracle_tde_database",
    "hyperledger",
    "luna_dke",
    "cyberark_digital_vault",
    "luna_hsm_backup",
    "payshield_na",
    "payshield_eu",
    "p2pe",
    "codesign-secure",
    "kt_ses",
    "kt_pki",
    "garasign",
    "pkiaas",
    "suredrop",
    "a24_hsm",
    "ascertia_pki",
    "codesign",
    "pk_sign_cloud",
    "kf_command",
    "pk_sign_sw",
    "ven_platform",
    "signpath",
];

/// Broad category of a service, derived from its type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFamily {
    Hsm,
    DataPlatform,
    Other,
}

impl ServiceFamily {
    pub fn classify(service_type: &str) -> Self {
        let service_type = service_type.trim().to_lowercase();
        if service_type == DATA_PLATFORM_SERVICE_TYPE {
            Self::DataPlatform
        } else if service_type.contains("hsm") || HSM_SERVICE_TYPES.contains(&service_type.as_str())
        {
            Self::Hsm
        } else {
            Self::Other
        }
    }
}

/// Accepts a JSON string or number, e.g. a partition serial.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// One entry of the service instance list, or a service detail record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceInstance {
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "serviceType")]
    pub service_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub partition_serial_number: Option<String>,
}

impl ServiceInstance {
    pub fn family(&self) -> ServiceFamily {
        ServiceFamily::classify(self.service_type.as_deref().unwrap_or_default())
    }
}

/// A client binding on a service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceBinding {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "clientId")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl ServiceBinding {
    fn identifier(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.client_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// How an export should be scoped to one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResolution {
    pub resource_id: String,
    /// Set for data-platform services and HSM partitions; exports then
    /// filter by source instead of resource id.
    pub source: Option<String>,
}

/// A service whose id and details have been looked up.
#[derive(Debug, Clone)]
pub struct ResolvedService {
    pub resource_id: String,
    pub instance: ServiceInstance,
}

impl ResolvedService {
    pub fn family(&self) -> ServiceFamily {
        self.instance.family()
    }

    pub fn resolution(&self) -> ServiceResolution {
        let source = match self.family() {
            ServiceFamily::DataPlatform => Some(DATA_PLATFORM_SOURCE.to_string()),
            _ => self
                .instance
                .partition_serial_number
                .as_ref()
                .map(|serial| format!("{}{}", HSM_SOURCE_PREFIX, serial)),
        };
        ServiceResolution {
            resource_id: self.resource_id.clone(),
            source,
        }
    }
}

/// Outcome of actor resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedActor {
    pub actor_id: String,
    pub family: ServiceFamily,
    /// False when the input was passed through unchanged.
    pub resolved: bool,
    pub warning: Option<String>,
}

/// Pick a service by name: exact first, then case-insensitive.
pub fn find_by_name<'a>(instances: &'a [ServiceInstance], name: &str) -> Option<&'a ServiceInstance> {
    instances
        .iter()
        .find(|s| s.name.as_deref() == Some(name))
        .or_else(|| {
            let wanted = name.to_lowercase();
            instances
                .iter()
                .find(|s| s.name.as_deref().map(str::to_lowercase).as_deref() == Some(wanted.as_str()))
        })
}

/// Looks up service and client identifiers through the console API
pub struct IdentifierResolver<'a> {
    client: &'a ConsoleClient,
}

impl<'a> IdentifierResolver<'a> {
    pub fn new(client: &'a ConsoleClient) -> Self {
        Self { client }
    }

    /// Every service instance in the account, across all pages.
    pub async fn list_instances(&self) -> Result<Vec<ServiceInstance>> {
        let mut instances = Vec::new();
        let mut page = 0u32;

        loop {
            let batch: Page<ServiceInstance> = self
                .client
                .get_json(
                    SERVICE_INSTANCES_PATH,
                    &[("page", page.to_string()), ("size", PAGE_SIZE.to_string())],
                )
                .await?;
            let fetched = batch.content.len();
            instances.extend(batch.content);

            let last_page = match batch.total_pages {
                Some(total) => page + 1 >= total,
                None => fetched < PAGE_SIZE as usize,
            };
            if fetched == 0 || last_page {
                break;
            }
            page += 1;
            if page >= MAX_PAGES {
                warn!(pages = page, "stopping service instance listing at page limit");
                break;
            }
        }

        debug!(count = instances.len(), "listed service instances");
        Ok(instances)
    }

    /// Resolve a service name or id to its id. Ids pass through untouched.
    pub async fn resolve_service(&self, identifier: &str, operation: &str) -> Result<String> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(PipelineError::validation(format!(
                "Service identifier is required for {}",
                operation
            )));
        }
        if is_uuid(identifier) {
            return Ok(identifier.to_string());
        }

        let instances = self.list_instances().await?;
        let Some(found) = find_by_name(&instances, identifier) else {
            let names: Vec<&str> = instances.iter().filter_map(|s| s.name.as_deref()).collect();
            return Err(PipelineError::NotFound(if names.is_empty() {
                format!("Service '{}' not found. No services found in account.", identifier)
            } else {
                format!(
                    "Service '{}' not found. Available services: {}",
                    identifier,
                    names.join(", ")
                )
            }));
        };

        let service_id = found.service_id.clone().filter(|id| !id.is_empty()).ok_or_else(|| {
            PipelineError::Transport(format!(
                "Found service by name '{}' but could not get its id from the response",
                identifier
            ))
        })?;
        info!(service = identifier, %service_id, "resolved service name");
        Ok(service_id)
    }

    /// Fetch the detail record of one service.
    pub async fn service_details(&self, service_id: &str) -> Result<ServiceInstance> {
        let path = format!("{}/{}", SERVICE_INSTANCES_PATH, service_id);
        match self.client.get_json(&path, &[]).await {
            Err(e) if e.status() == Some(404) => Err(PipelineError::NotFound(format!(
                "Service '{}' not found",
                service_id
            ))),
            other => other,
        }
    }

    /// Resolve a service and load its details.
    pub async fn resolve_service_details(&self, identifier: &str) -> Result<ResolvedService> {
        let resource_id = self.resolve_service(identifier, "audit log retrieval").await?;
        let instance = self.service_details(&resource_id).await?;
        Ok(ResolvedService {
            resource_id,
            instance,
        })
    }

    /// Resolve a service and derive its export scope.
    pub async fn resolve_service_scope(&self, identifier: &str) -> Result<ServiceResolution> {
        Ok(self.resolve_service_details(identifier).await?.resolution())
    }

    /// Resolve a client name bound to a service. Ids pass through untouched.
    pub async fn resolve_client(&self, service_id: &str, client: &str) -> Result<String> {
        let client = client.trim();
        if is_uuid(client) {
            return Ok(client.to_string());
        }

        let path = format!("{}/{}/bindings", SERVICE_INSTANCES_PATH, service_id);
        let bindings: Page<ServiceBinding> = self.client.get_json(&path, &[]).await?;

        bindings
            .content
            .iter()
            .find(|b| b.name.as_deref() == Some(client))
            .and_then(ServiceBinding::identifier)
            .map(str::to_string)
            .ok_or_else(|| {
                PipelineError::NotFound(format!(
                    "Client '{}' not found for service '{}'",
                    client, service_id
                ))
            })
    }

    /// Resolve an actor name in the context of a service identifier.
    pub async fn resolve_actor(&self, service: &str, actor: &str) -> Result<ResolvedActor> {
        let service = self.resolve_service_details(service).await?;
        Ok(self.resolve_actor_for(&service, actor).await)
    }

    /// Resolve an actor for an already resolved service.
    ///
    /// HSM services map client names to binding ids; when that lookup fails
    /// the actor is used verbatim. Data-platform actors are usernames and are
    /// never looked up.
    pub async fn resolve_actor_for(&self, service: &ResolvedService, actor: &str) -> ResolvedActor {
        let family = service.family();
        let verbatim = |warning: Option<String>| ResolvedActor {
            actor_id: actor.to_string(),
            family,
            resolved: false,
            warning,
        };

        match family {
            ServiceFamily::Hsm => match self.resolve_client(&service.resource_id, actor).await {
                Ok(actor_id) => ResolvedActor {
                    resolved: actor_id != actor,
                    actor_id,
                    family,
                    warning: None,
                },
                Err(e) => {
                    debug!(actor, error = %e, "client lookup failed, using actor as given");
                    verbatim(None)
                }
            },
            ServiceFamily::DataPlatform => verbatim(Some(format!(
                "Actor '{}' was used as given: data platform actors are usernames, not client ids",
                actor
            ))),
            ServiceFamily::Other => verbatim(None),
        }
    }
}
