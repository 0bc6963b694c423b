fn main() {
    built::write_built_file().expect("Failed to record build information for the version string");
}
