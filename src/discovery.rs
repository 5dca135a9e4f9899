use anyhow::{bail, Result};
use tracing::debug;
use xmltree::Element;

use crate::soap::SoapClient;
use crate::types::ServiceDescriptor;
use crate::xmlutils::{child_elements, child_text};

/// Description document paths probed in order. Firmware versions differ in
/// which of these they serve.
pub const DESCRIPTION_PATHS: &[&str] = &[
    "/tr64desc.xml",
    "/igddesc.xml",
    "/description.xml",
    "/igd2desc.xml",
];

/// Service-type fragments that may carry connection information, most
/// promising first.
pub const SERVICE_TYPE_FRAGMENTS: &[&str] = &[
    "WANIPConnection",
    "WANPPPConnection",
    "ConnectionManager",
    "PPPConnection",
    "WANCommonInterfaceConfig",
    "DeviceInfo",
    "Layer3Forwarding",
];

/// Fetch the device description, trying each candidate path in order.
/// Fatal when none of them yields a parseable XML document.
pub async fn fetch_device_description(client: &SoapClient) -> Result<Element> {
    for &path in DESCRIPTION_PATHS {
        match client.get_document(path).await {
            Ok(doc) => {
                debug!(path, "device description found");
                return Ok(doc);
            }
            Err(e) => {
                debug!(path, error = %e, "description candidate failed");
            }
        }
    }
    bail!(
        "no device description at {} (tried {}); check host and credentials",
        client.base(),
        DESCRIPTION_PATHS.join(", ")
    )
}

/// First service whose declared type contains one of the fragments.
///
/// Fragments are tried in priority order; within a fragment the tree is walked
/// depth-first in document order, so sub-elements win over later siblings.
pub fn locate_service(root: &Element, fragments: &[&str]) -> Option<ServiceDescriptor> {
    for &fragment in fragments {
        if let Some(svc) = find_service(root, fragment) {
            return Some(svc);
        }
    }
    None
}

/// Depth-first document-order search for a `service` element whose
/// `serviceType` contains `fragment` (case-insensitive). Service elements
/// without a control URL are skipped.
pub fn find_service(el: &Element, fragment: &str) -> Option<ServiceDescriptor> {
    if el.name == "service" {
        if let Some(service_type) = child_text(el, "serviceType") {
            if service_type
                .to_ascii_lowercase()
                .contains(&fragment.to_ascii_lowercase())
            {
                if let Some(control_url) = child_text(el, "controlURL") {
                    return Some(ServiceDescriptor {
                        service_type,
                        control_url,
                    });
                }
            }
        }
        return None;
    }
    for child in child_elements(el) {
        if let Some(found) = find_service(child, fragment) {
            return Some(found);
        }
    }
    None
}

/// Every service type declared anywhere in the description, document order.
/// Used to show the operator what the firmware offers when nothing matched.
pub fn list_service_types(el: &Element) -> Vec<String> {
    let mut out = Vec::new();
    collect_service_types(el, &mut out);
    out
}

fn collect_service_types(el: &Element, out: &mut Vec<String>) {
    if el.name == "service" {
        if let Some(t) = child_text(el, "serviceType") {
            out.push(t);
        }
        return;
    }
    for child in child_elements(el) {
        collect_service_types(child, out);
    }
}
