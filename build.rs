use cfg_aliases::cfg_aliases;

fn main() {
    // Setup cfg aliases
    cfg_aliases! {
        // Platforms
        free_unix: {
            all(
                unix,
                not(target_vendor = "apple"),
                not(target_os = "android"),
                not(target_os = "redox"),
                not(target_family = "wasm")
            )
        },
        x11_platform: { all(free_unix, feature = "x11") },

        // dependencies
        serde : { feature = "serde" },
    }
}
