//! Hand-off artifacts for the packet/DNS-level blocker.

use std::io;
use std::path::Path;

use sv_core::HostSet;

use crate::store::write_atomic;

/// Write `hosts` as a sorted newline-delimited list. Returns the host count.
pub fn export_hosts(hosts: &HostSet, path: &Path) -> io::Result<usize> {
    write_atomic(path, hosts.to_export_string().as_bytes())?;
    Ok(hosts.len())
}

/// Write the concatenated list text the last rebuild was compiled from.
pub fn write_merged(text: &str, path: &Path) -> io::Result<()> {
    write_atomic(path, text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sv_compiler::parse_filter_list;

    #[test]
    fn exported_list_reparses_to_same_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/blocked_domains.txt");

        let parsed = parse_filter_list("||ads.example^\ntracker.net\nhttp://cdn.example.org/x\n");
        assert_eq!(export_hosts(&parsed.hosts, &path).unwrap(), 3);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "ads.example\ncdn.example.org\ntracker.net\n");
        assert_eq!(parse_filter_list(&text).hosts, parsed.hosts);
    }

    #[test]
    fn export_overwrites_previous_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocked_domains.txt");

        let first: HostSet = ["a.example", "b.example"].into_iter().collect();
        let second: HostSet = ["c.example"].into_iter().collect();
        export_hosts(&first, &path).unwrap();
        export_hosts(&second, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "c.example\n");
    }
}
