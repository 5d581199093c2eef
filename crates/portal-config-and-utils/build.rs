fn main() {
    // Baked into DEFAULT_SUPABASE_* through option_env!.
    for var in ["SUPABASE_URL", "SUPABASE_PUBLISHABLE_KEY"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
}
