use tracing::{debug, info, instrument};

use super::{CreateRequest, CustodianRequest, DocumentStore, UpdateOptions, Vdr, authorize};
use crate::document::{
    CreateOptions, Document, DocumentBuilder, DocumentUpdate, Relationship, Service,
    VerificationMethodBuilder,
};
use crate::error::Error;
use crate::key::{self, DID_KEY_PREFIX};
use crate::multicodec::PublicKey;
use crate::tracerr;

/// Self-resolving registry for `did:key`.
///
/// Unknown `did:key` identifiers resolve to the document derived from their
/// key. Created and updated documents are kept in the [`DocumentStore`] and
/// take precedence over derivation. Updates never change the DID itself.
#[derive(Clone, Debug, Default)]
pub struct KeyVdr {
    store: DocumentStore,
    options: CreateOptions,
}

impl KeyVdr {
    /// Create a registry backed by `store`.
    #[must_use]
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            options: CreateOptions::default(),
        }
    }

    /// Options used when building documents.
    #[must_use]
    pub fn with_options(mut self, options: CreateOptions) -> Self {
        self.options = options;
        self
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Forget every created or updated document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the store is unavailable.
    pub fn reset(&self) -> crate::Result<()> {
        self.store.reset()
    }

    fn build(
        &self, did: &str, key: PublicKey, relationships: &[Relationship], services: Vec<Service>,
        options: &CreateOptions,
    ) -> crate::Result<Document> {
        let mut vm = VerificationMethodBuilder::new(key).did(did);
        if options.multikey {
            vm = vm.multikey();
        }
        let vm = vm.build()?;

        let mut builder =
            DocumentBuilder::with_options(did, options).verification_method(vm.clone());
        for relationship in relationships {
            builder = builder.relationship(*relationship, &vm.id);
        }
        for mut service in services {
            if service.id.starts_with('#') {
                service.id = format!("{did}{}", service.id);
            }
            builder = builder.service(service);
        }
        builder.build()
    }
}

impl Vdr for KeyVdr {
    fn method(&self) -> &str {
        "key"
    }

    #[instrument(level = "debug", skip(self))]
    async fn resolve(&self, did: &str) -> crate::Result<Option<Document>> {
        if let Some(doc) = self.store.get(did)? {
            debug!("served from store");
            return Ok(Some(doc));
        }

        match key::document_with_options(did, &self.options) {
            Ok(doc) => {
                debug!("derived from key");
                Ok(Some(doc))
            }
            Err(e) => {
                debug!(error = %e, "not a resolvable did:key");
                Ok(None)
            }
        }
    }

    async fn create(&self, request: CreateRequest) -> crate::Result<Document> {
        let key = PublicKey::from_multibase(&request.public_key_multibase)?;
        let did = key.to_did_key()?;

        if let Some(preferred) = &request.preferred_did {
            if *preferred != did {
                tracerr!(Error::InvalidDid(format!(
                    "{preferred} does not match the key, which derives {did}"
                )));
            }
        }

        let relationships = if request.relationships.is_empty() {
            Relationship::ALL.to_vec()
        } else {
            request.relationships
        };
        let options = request.options.unwrap_or_else(|| self.options.clone());

        let doc = self.build(&did, key, &relationships, request.services, &options)?;
        self.store.insert_new(doc.clone())?;
        info!(%did, "created did:key document");

        Ok(doc)
    }

    async fn create_via_custodian(&self, request: CustodianRequest) -> crate::Result<Document> {
        if !request.user_did.starts_with(DID_KEY_PREFIX) {
            tracerr!(Error::MethodNotSupported(format!(
                "custodial creation requires a did:key, got {}",
                request.user_did
            )));
        }
        let (key_type, bytes) = key::parse_did_key(&request.user_did)?;
        let key = PublicKey { key_type, bytes };

        let relationships = [Relationship::Authentication, Relationship::CapabilityDelegation];
        let doc =
            self.build(&request.user_did, key, &relationships, request.services, &self.options)?;
        self.store.insert_new(doc.clone())?;
        info!(did = %request.user_did, "created did:key document for custodian");

        Ok(doc)
    }

    #[instrument(level = "debug", skip(self, update))]
    async fn update(
        &self, did: &str, update: DocumentUpdate, options: &UpdateOptions,
    ) -> crate::Result<Document> {
        let Some(doc) = self.resolve(did).await? else {
            tracerr!(Error::NotFound(format!("DID document for {did}")));
        };

        authorize(&doc, &options.key_id, update.required_relationship())?;
        let updated = doc.apply(&update)?;
        self.store.put(updated.clone())?;
        info!(did, "updated did:key document");

        Ok(updated)
    }
}
