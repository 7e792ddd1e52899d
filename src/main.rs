fn main() -> Result<(), Box<dyn std::error::Error>> {
    readmegen::cli::main()
}
