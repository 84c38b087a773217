use colored::Colorize;

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", rule(title));
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Underline matching the displayed width of `title`
fn rule(title: &str) -> String {
    "─".repeat(title.chars().count()).dimmed().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_counts_characters() {
        colored::control::set_override(false);
        assert_eq!(rule("Deploy"), "──────");
        assert_eq!(rule("Déploy"), "──────");
    }
}
