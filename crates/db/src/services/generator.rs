use rand::seq::SliceRandom;
use rand::Rng;

const FIRST_NAMES: &[&str] = &[
    "Ash", "Blaze", "Cinder", "Corvin", "Dusk", "Ember", "Hex", "Isolde", "Jinx", "Kestrel",
    "Lilith", "Morrigan", "Nyx", "Obsidian", "Raven", "Sable", "Salem", "Thorn", "Umbra",
    "Vesper", "Wren", "Zephyr",
];

const LAST_NAMES: &[&str] = &[
    "Ashgrove", "Blackwood", "Cinderfall", "Crowley", "Duskmere", "Emberlyn", "Grimshaw",
    "Hollowell", "Marrowind", "Nightingale", "Ravenscar", "Shadowmere", "Stormwell",
    "Thornbury", "Vantablack", "Wolfsbane", "Wraithmoor",
];

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

pub const PASSWORD_MIN_LEN: usize = 12;
pub const PASSWORD_MAX_LEN: usize = 16;

/// Exclusive upper bound of the numeric suffix in generated addresses.
const SUFFIX_BOUND: u32 = 9999;

/// Picks a first and last name uniformly from the built-in pools.
pub fn random_name() -> (&'static str, &'static str) {
    let mut rng = rand::thread_rng();
    let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
    (first, last)
}

/// Lowercases a name and drops everything that is not an ASCII letter.
pub fn clean_name_part(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// Builds `first.last<n>@domain` from the cleaned name parts. The whole
/// address is lowercase since inbound recipients are matched lowercased.
pub fn generate_email_address(first_name: &str, last_name: &str, domain: &str) -> String {
    let suffix = rand::thread_rng().gen_range(0..SUFFIX_BOUND);
    format!(
        "{}.{}{}@{}",
        clean_name_part(first_name),
        clean_name_part(last_name),
        suffix,
        domain.trim().to_lowercase()
    )
}

fn pick(rng: &mut impl Rng, charset: &[u8]) -> u8 {
    charset[rng.gen_range(0..charset.len())]
}

/// Generates a 12 to 16 character password holding at least one uppercase
/// letter, lowercase letter, digit and symbol, in shuffled order.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    let length = rng.gen_range(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN);

    let mut password = vec![
        pick(&mut rng, UPPERCASE),
        pick(&mut rng, LOWERCASE),
        pick(&mut rng, DIGITS),
        pick(&mut rng, SYMBOLS),
    ];

    let all: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS].concat();
    while password.len() < length {
        password.push(pick(&mut rng, &all));
    }

    password.shuffle(&mut rng);
    password.into_iter().map(char::from).collect()
}
