/// Segment index of the workspace (cloud instance) ID when a CRN is
/// split on `:`. Layout fixed by the upstream service:
/// `crn:v1:staging:public:power-iaas:{region}:a/{account_id}:{workspace_id}::`
const WORKSPACE_SEGMENT: usize = 7;

/// Build the scope CRN for a workspace from its region and identifiers.
///
/// Every workspace-scoped API call carries this string in the `CRN`
/// header. It is always recomputed from its parts, never stored.
#[must_use]
pub fn workspace_crn(region: &str, account_id: &str, workspace_id: &str) -> String {
    format!("crn:v1:staging:public:power-iaas:{region}:a/{account_id}:{workspace_id}::")
}

/// Extract the cloud instance (workspace) ID from a scope CRN.
///
/// Returns `None` when the string has too few segments or the workspace
/// segment is empty, so a malformed CRN never produces a bogus scope.
#[must_use]
pub fn cloud_instance_id(crn: &str) -> Option<&str> {
    crn.split(':')
        .nth(WORKSPACE_SEGMENT)
        .filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // --- workspace_crn output format ---

    #[test]
    fn workspace_crn_format() {
        assert_eq!(
            workspace_crn("dal10", "abc123", "ws-1"),
            "crn:v1:staging:public:power-iaas:dal10:a/abc123:ws-1::"
        );
    }

    // --- cloud_instance_id extraction ---

    #[test]
    fn cloud_instance_id_extracts_workspace_segment() {
        let crn = "crn:v1:staging:public:power-iaas:dal10:a/abc123:ws-1::";
        assert_eq!(cloud_instance_id(crn), Some("ws-1"));
    }

    #[test]
    fn cloud_instance_id_rejects_empty_string() {
        assert_eq!(cloud_instance_id(""), None);
    }

    #[test]
    fn cloud_instance_id_rejects_too_few_segments() {
        assert_eq!(cloud_instance_id("crn:v1:staging:public"), None);
        assert_eq!(cloud_instance_id("not-a-crn"), None);
    }

    #[test]
    fn cloud_instance_id_rejects_empty_workspace_segment() {
        let crn = "crn:v1:staging:public:power-iaas:dal10:a/abc123:::";
        assert_eq!(cloud_instance_id(crn), None);
    }

    // --- Property tests ---

    proptest! {
        #[test]
        fn compose_then_extract_round_trips(
            region in "[a-z]{3}[0-9]{1,2}",
            account in "[a-f0-9]{8,32}",
            workspace in "[a-z0-9-]{1,36}",
        ) {
            let crn = workspace_crn(&region, &account, &workspace);
            prop_assert_eq!(cloud_instance_id(&crn), Some(workspace.as_str()));
        }
    }
}
