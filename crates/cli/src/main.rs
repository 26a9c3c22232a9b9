fn main() -> Result<(), Box<dyn std::error::Error>> {
    stylescope_cli::run()
}
