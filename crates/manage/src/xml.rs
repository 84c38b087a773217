//! Minimal XML reading for management API bodies.

use regex::Regex;

/// Text of the first element with the given local name, any namespace prefix.
///
/// Surrounding whitespace is trimmed. Elements with child elements yield `None`.
///
/// ```
/// use manage::xml_element_text;
///
/// let body = "<rapi:error><rapi:messageCode> XDMP-NOSUCHDB </rapi:messageCode></rapi:error>";
/// assert_eq!(xml_element_text(body, "messageCode").as_deref(), Some("XDMP-NOSUCHDB"));
/// assert_eq!(xml_element_text(body, "message"), None);
/// ```
#[must_use]
pub fn xml_element_text(body: &str, element: &str) -> Option<String> {
    let pattern = format!(
        r"<(?:[\w.-]+:)?{}(?:\s[^>]*)?>\s*([^<]*?)\s*</",
        regex::escape(element)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_and_namespaces() {
        let body = "<database-properties xmlns=\"http://marklogic.com/manage\">\
            <database-name id=\"1\">db1</database-name></database-properties>";
        assert_eq!(xml_element_text(body, "database-name").as_deref(), Some("db1"));
        assert_eq!(xml_element_text(body, "database"), None);
    }

    #[test]
    fn test_similar_names_not_confused() {
        let body = "<message-code>ignored</message-code><messageCode>XDMP-NOSUCHDB</messageCode>";
        assert_eq!(xml_element_text(body, "messageCode").as_deref(), Some("XDMP-NOSUCHDB"));
        assert_eq!(xml_element_text(body, "message"), None);
    }
}
