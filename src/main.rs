fn main() {
    std::process::exit(backuputil::cli::run());
}
