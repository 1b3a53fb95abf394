//! Synthetic users and products for benchmark batches.
//!
//! Names are built from syllables the same way for every run of a given
//! seed, so tests and CLI runs with `--seed` are reproducible.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::records::{PaymentMethod, Product, StockDelta, USER_ADDRESS_MAX, User};

const SYL1: [&str; 48] = [
    "ma", "ana", "lu", "jo", "pe", "ra", "ca", "fer", "gab", "ju", "le", "bi", "ri", "val", "da",
    "thi", "re", "si", "mar", "vi", "is", "el", "ro", "ad", "ber", "cla", "de", "fa", "gi", "hel",
    "ig", "la", "mi", "nat", "ot", "pa", "que", "sa", "ta", "ur", "ve", "wal", "yas", "zel", "bru",
    "cris", "dan", "edu",
];
const SYL2: [&str; 12] = [
    "ria", "lia", "cas", "dro", "nan", "bel", "ena", "rio", "sio", "ton", "lo", "nia",
];
const SYL3: [&str; 5] = ["a", "e", "i", "o", "u"];

const SURNAMES: [&str; 20] = [
    "Silva", "Santos", "Oliveira", "Souza", "Rodrigues", "Ferreira", "Alves", "Pereira", "Lima",
    "Gomes", "Costa", "Ribeiro", "Martins", "Carvalho", "Almeida", "Lopes", "Soares", "Fernandes",
    "Vieira", "Barbosa",
];

const STREET_TYPES: [&str; 5] = ["Rua", "Avenida", "Travessa", "Alameda", "Praça"];
const DISTRICTS: [&str; 8] = [
    "Centro", "Boa Vista", "Jardim América", "Vila Nova", "Santa Cruz", "Liberdade", "Aldeota",
    "Moinhos de Vento",
];
const CITIES: [(&str, &str); 8] = [
    ("São Paulo", "SP"),
    ("Rio de Janeiro", "RJ"),
    ("Belo Horizonte", "MG"),
    ("Recife", "PE"),
    ("Fortaleza", "CE"),
    ("Porto Alegre", "RS"),
    ("Curitiba", "PR"),
    ("Salvador", "BA"),
];

const PRODUCT_ADJECTIVES: [&str; 10] = [
    "Compact", "Deluxe", "Portable", "Classic", "Wireless", "Ergonomic", "Rustic", "Smart",
    "Heavy-Duty", "Mini",
];
const PRODUCT_NOUNS: [&str; 10] = [
    "Lamp", "Chair", "Kettle", "Backpack", "Speaker", "Notebook", "Blender", "Umbrella", "Desk",
    "Headset",
];

/// Largest decrement a generated update asks for.
pub const MAX_STOCK_DELTA: u32 = 3;

pub struct FakeDataGenerator<R = StdRng> {
    rng: R,
}

impl FakeDataGenerator<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> FakeDataGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn users(&mut self, count: usize) -> Result<Vec<User>> {
        (0..count).map(|_| self.user()).collect()
    }

    pub fn products(&mut self, count: usize) -> Result<Vec<Product>> {
        (0..count).map(|_| self.product()).collect()
    }

    /// `count` decrements aimed at keys drawn (with repetition) from `keys`.
    pub fn stock_deltas(&mut self, keys: &[u64], count: usize) -> Vec<StockDelta> {
        if keys.is_empty() {
            return Vec::new();
        }
        let mut deltas = Vec::with_capacity(count);
        for _ in 0..count {
            let key = keys[self.rng.gen_range(0..keys.len())];
            let delta = self.rng.gen_range(1..=MAX_STOCK_DELTA);
            deltas.push(StockDelta { key, delta });
        }
        deltas
    }

    fn user(&mut self) -> Result<User> {
        let name = self.person_name();
        let cpf = self.cpf();
        let rg = self.rng.gen_range(10_000_000..=99_999_999u32).to_string();
        let address = self.address();
        let method = *PaymentMethod::ALL
            .choose(&mut self.rng)
            .unwrap_or(&PaymentMethod::Pix);
        User::new(name, cpf, rg, address, method)
    }

    fn product(&mut self) -> Result<Product> {
        let name = format!(
            "{} {}",
            self.pick(&PRODUCT_ADJECTIVES),
            self.pick(&PRODUCT_NOUNS)
        );
        let price_cents = self.rng.gen_range(199..=99_999);
        let stock = self.rng.gen_range(10..=500);
        Product::new(name, price_cents, stock)
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[self.rng.gen_range(0..options.len())]
    }

    fn person_name(&mut self) -> String {
        let mut given = String::new();
        given.push_str(self.pick(&SYL1));
        given.push_str(self.pick(&SYL2));
        if self.rng.gen_range(0..2) == 1 {
            given.push_str(self.pick(&SYL3));
        }
        if let Some(first_char) = given.chars().next() {
            given.replace_range(0..1, &first_char.to_uppercase().to_string());
        }
        format!("{} {}", given, self.pick(&SURNAMES))
    }

    /// Eleven digits with valid CPF check digits.
    fn cpf(&mut self) -> String {
        loop {
            let mut digits: Vec<u32> = (0..9).map(|_| self.rng.gen_range(0..10)).collect();
            // Repeated-digit CPFs pass the checksum but are never issued.
            if digits.iter().all(|&d| d == digits[0]) {
                continue;
            }
            let first = cpf_check_digit(&digits);
            digits.push(first);
            let second = cpf_check_digit(&digits);
            digits.push(second);
            return digits
                .iter()
                .filter_map(|d| char::from_digit(*d, 10))
                .collect();
        }
    }

    fn address(&mut self) -> String {
        let (city, state) = CITIES[self.rng.gen_range(0..CITIES.len())];
        let address = format!(
            "{} {}, {}, {} - {}/{}",
            self.pick(&STREET_TYPES),
            self.pick(&SURNAMES),
            self.rng.gen_range(1..=9999),
            self.pick(&DISTRICTS),
            city,
            state
        );
        address.chars().take(USER_ADDRESS_MAX).collect()
    }
}

/// Mod-11 check digit over `digits`, weighted from `len + 1` down to 2.
pub fn cpf_check_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();
    match sum % 11 {
        0 | 1 => 0,
        rest => 11 - rest,
    }
}
