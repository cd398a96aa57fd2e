//! Capability tokens and the alias table used for set-containment matching.
//!
//! A fixed, declarative table rather than ad hoc
//! string comparisons sprinkled through the scheduler.

use crate::node::Node;

/// One alias rule: a required token is satisfied by a worker advertising
/// `provided`, but only when the worker's GPU family matches `family_hint`
/// (checked via [`Node::is_nvidia_family`] or a plain substring match against
/// `gpu_type`). `family_hint` of `None` means the alias needs no GPU-family
/// check beyond advertising the token.
struct Alias {
    required: &'static str,
    provided: &'static str,
    family_hint: Option<&'static str>,
}

const ALIASES: &[Alias] = &[
    Alias { required: "nvenc_h264", provided: "gpu_h264", family_hint: Some("nvidia") },
    Alias { required: "nvenc_h265", provided: "gpu_h265", family_hint: Some("nvidia") },
    Alias { required: "nvenc_hevc", provided: "gpu_hevc", family_hint: Some("nvidia") },
    Alias { required: "qsv_h264", provided: "gpu_h264", family_hint: Some("intel") },
    Alias { required: "vaapi_h264", provided: "gpu_h264", family_hint: Some("intel") },
    Alias { required: "vaapi_h264", provided: "gpu_h264", family_hint: Some("amd") },
];

/// The known-good set of required-capability tokens, used to validate job
/// submissions before they ever reach the scheduler.
pub fn known_capability_tokens() -> &'static [&'static str] {
    &[
        "x264",
        "x265",
        "vp9",
        "av1",
        "nvenc_h264",
        "nvenc_h265",
        "nvenc_hevc",
        "qsv_h264",
        "qsv_h265",
        "vaapi_h264",
        "gpu_h264",
        "gpu_h265",
        "gpu_hevc",
    ]
}

/// Does `node` satisfy `required` token either directly or via an alias?
pub fn capability_satisfied(node: &Node, required: &str) -> bool {
    if node.gpu_capabilities.contains(required) {
        return true;
    }
    ALIASES.iter().any(|alias| {
        alias.required == required
            && node.gpu_capabilities.contains(alias.provided)
            && alias
                .family_hint
                .map(|hint| node_matches_family(node, hint))
                .unwrap_or(true)
    })
}

fn node_matches_family(node: &Node, hint: &str) -> bool {
    match hint {
        "nvidia" => node.is_nvidia_family(),
        other => node
            .gpu_type
            .as_deref()
            .map(|g| g.to_ascii_lowercase().contains(other))
            .unwrap_or(false),
    }
}

/// Does `node` satisfy every capability in `required`?
pub fn node_satisfies_all(node: &Node, required: &[String]) -> bool {
    required.iter().all(|cap| capability_satisfied(node, cap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};
    use uuid::Uuid;

    fn node_with(gpu_type: Option<&str>, caps: &[&str]) -> Node {
        Node {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "n1".into(),
            address: "10.0.0.1:9000".into(),
            node_type: crate::node::NodeType::Server,
            cpu_threads: 16,
            cpu_model: "epyc".into(),
            has_gpu: gpu_type.is_some(),
            gpu_type: gpu_type.map(String::from),
            gpu_capabilities: caps.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            ram_total_bytes: 64 * 1024 * 1024 * 1024,
            labels: BTreeMap::new(),
            status: crate::node::NodeStatus::Available,
            last_heartbeat: chrono::Utc::now(),
            registered_at: chrono::Utc::now(),
            current_job_id: None,
        }
    }

    #[test]
    fn exact_token_match() {
        let node = node_with(None, &["x264"]);
        assert!(capability_satisfied(&node, "x264"));
        assert!(!capability_satisfied(&node, "vp9"));
    }

    #[test]
    fn nvenc_alias_requires_nvidia_family() {
        let nvidia = node_with(Some("NVIDIA RTX 4090"), &["gpu_h264"]);
        assert!(capability_satisfied(&nvidia, "nvenc_h264"));

        let amd = node_with(Some("AMD Radeon RX 7900"), &["gpu_h264"]);
        assert!(!capability_satisfied(&amd, "nvenc_h264"));
    }

    #[test]
    fn node_satisfies_all_requires_every_token() {
        let node = node_with(Some("NVIDIA A10"), &["gpu_h264", "x264"]);
        assert!(node_satisfies_all(&node, &["x264".into(), "nvenc_h264".into()]));
        assert!(!node_satisfies_all(&node, &["x264".into(), "vp9".into()]));
    }
}
