//! Fixed vocabularies the generators draw from.

use rand::seq::IndexedRandom;
use rand::Rng;

pub const CITIES: &[(&str, &str)] = &[
    ("São Paulo", "SP"),
    ("Campinas", "SP"),
    ("Santos", "SP"),
    ("Guarulhos", "SP"),
    ("Sorocaba", "SP"),
    ("Ribeirão Preto", "SP"),
    ("São José dos Campos", "SP"),
    ("Osasco", "SP"),
    ("Rio de Janeiro", "RJ"),
    ("Niterói", "RJ"),
    ("Curitiba", "PR"),
    ("Londrina", "PR"),
    ("Belo Horizonte", "MG"),
    ("Uberlândia", "MG"),
    ("Juiz de Fora", "MG"),
    ("Florianópolis", "SC"),
    ("Joinville", "SC"),
    ("Porto Alegre", "RS"),
    ("Goiânia", "GO"),
    ("Brasília", "DF"),
];

pub const DISTRICTS: &[&str] = &[
    "Centro",
    "Jardim América",
    "Vila Nova",
    "Bela Vista",
    "Santa Cecília",
    "Pinheiros",
    "Moema",
    "Boa Vista",
    "Liberdade",
    "Consolação",
];

pub const STREETS: &[&str] = &[
    "Rua das Flores",
    "Avenida Paulista",
    "Rua XV de Novembro",
    "Avenida Brasil",
    "Rua da Consolação",
    "Rua Augusta",
    "Avenida Independência",
    "Rua Sete de Setembro",
    "Rua Tiradentes",
    "Avenida das Nações",
];

pub const STORE_PREFIXES: &[&str] = &[
    "Sabor", "Casa", "Cantina", "Empório", "Bistrô", "Ponto", "Cozinha", "Recanto",
];

pub const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Diego", "Eduarda", "Felipe", "Gabriela", "Henrique", "Isabela",
    "João", "Larissa", "Marcos", "Natália", "Otávio", "Paula", "Rafael", "Sofia", "Thiago",
    "Vanessa", "Lucas",
];

pub const LAST_NAMES: &[&str] = &[
    "Silva", "Santos", "Oliveira", "Souza", "Rodrigues", "Ferreira", "Alves", "Pereira", "Lima",
    "Gomes", "Costa", "Ribeiro", "Martins", "Carvalho", "Almeida",
];

pub const EMAIL_DOMAINS: &[&str] = &["example.com", "mail.com", "inbox.com", "email.net"];

pub const GENDERS: &[&str] = &["M", "F", "NB"];

/// (category, product names)
pub const PRODUCT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Burgers",
        &["Classic Burger", "Cheeseburger", "Bacon Burger", "Veggie Burger", "Double Smash"],
    ),
    (
        "Pizzas",
        &["Margherita", "Pepperoni", "Four Cheese", "Calabresa", "Portuguesa"],
    ),
    (
        "Drinks",
        &["Cola", "Guaraná", "Orange Juice", "Lemonade", "Iced Tea", "Sparkling Water"],
    ),
    (
        "Desserts",
        &["Brownie", "Açaí Bowl", "Pudim", "Cheesecake", "Ice Cream"],
    ),
    (
        "Sides",
        &["French Fries", "Onion Rings", "Coxinha", "Pão de Queijo", "Salad"],
    ),
    (
        "Combos",
        &["Burger Combo", "Family Combo", "Pizza Combo", "Kids Combo"],
    ),
];

/// (category, item names)
pub const ITEM_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Extras",
        &["Extra Cheese", "Bacon", "Fried Egg", "Cheddar", "Caramelized Onion", "Jalapeño"],
    ),
    (
        "Sauces",
        &["Barbecue", "Garlic Mayo", "Hot Sauce", "Mustard", "Ketchup"],
    ),
];

/// (option group, index into ITEM_CATEGORIES)
pub const OPTION_GROUPS: &[(&str, usize)] = &[
    ("Add-ons", 0),
    ("Remove ingredients", 0),
    ("Sauces", 1),
    ("Dipping sauces", 1),
];

/// (channel, description, is delivery)
pub const CHANNELS: &[(&str, &str, bool)] = &[
    ("Presencial", "Counter and table service", false),
    ("iFood", "iFood marketplace", true),
    ("Rappi", "Rappi marketplace", true),
    ("Uber Eats", "Uber Eats marketplace", true),
    ("WhatsApp", "Orders taken over WhatsApp", true),
    ("App Próprio", "Own delivery app", true),
];

pub const BRAND_NAME: &str = "Sabor Brasil Group";

pub const SUB_BRANDS: &[&str] = &["Sabor Burger", "Sabor Pizza", "Sabor Express"];

/// Uniform pick from a non-empty constant list.
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, values: &'a [T]) -> &'a T {
    values
        .choose(rng)
        .expect("vocabulary lists are non-empty")
}

pub fn full_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

/// Lowercase ASCII local part for an email address.
pub fn email_local_part(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            ' ' => '.',
            other => other.to_ascii_lowercase(),
        })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("João Gomes"), "joao.gomes");
        assert_eq!(email_local_part("Natália Souza"), "natalia.souza");
    }

    #[test]
    fn test_option_groups_point_at_item_categories() {
        assert!(OPTION_GROUPS
            .iter()
            .all(|(_, category)| *category < ITEM_CATEGORIES.len()));
    }
}
