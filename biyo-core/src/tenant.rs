//! Clinic scoping for service calls.

/// Identifier of the clinic a call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Context carried with every service call.
///
/// A missing tenant means the caller did not name a clinic; list reads then
/// return records of every clinic, the same way an unfiltered query would.
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    pub tenant_id: Option<TenantId>,
}

impl TenantContext {
    pub fn new<S: Into<String>>(clinic_id: S) -> Self {
        Self {
            tenant_id: Some(TenantId(clinic_id.into())),
        }
    }

    /// A call that is not scoped to any clinic.
    pub fn unscoped() -> Self {
        Self { tenant_id: None }
    }

    /// Build from an optional raw value, treating blank strings as absent.
    pub fn from_optional(clinic_id: Option<&str>) -> Self {
        match clinic_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => Self::new(id),
            None => Self::unscoped(),
        }
    }

    pub fn clinic_id(&self) -> Option<&str> {
        self.tenant_id.as_ref().map(TenantId::as_str)
    }

    pub fn is_scoped(&self) -> bool {
        self.tenant_id.is_some()
    }

    /// Whether a record owned by `record_clinic` is visible in this context.
    pub fn admits(&self, record_clinic: Option<&str>) -> bool {
        match self.clinic_id() {
            Some(clinic) => record_clinic == Some(clinic),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_clinic_is_unscoped() {
        assert!(!TenantContext::from_optional(Some("  ")).is_scoped());
        assert!(!TenantContext::from_optional(None).is_scoped());
        assert_eq!(
            TenantContext::from_optional(Some("clinic_1")).clinic_id(),
            Some("clinic_1")
        );
    }

    #[test]
    fn scoped_context_only_admits_own_clinic() {
        let ctx = TenantContext::new("a");
        assert!(ctx.admits(Some("a")));
        assert!(!ctx.admits(Some("b")));
        assert!(!ctx.admits(None));
        assert!(TenantContext::unscoped().admits(Some("b")));
    }
}
