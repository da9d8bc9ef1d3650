//! Built-in word lists and obfuscation patterns.
//!
//! Spanish and English, the two languages the site's audience writes in.
//! All entries are lowercase; matching lowercases the input.

/// Exact substrings rejected in comment bodies.
pub const BANNED_TERMS: &[&str] = &[
    // Profanity and common insults (es)
    "puta", "puto", "zorra", "cabron", "cabrón", "coño", "joder", "mierda", "cagar", "verga",
    "pendejo", "pendeja", "chingar", "pinche", "culero", "culera", "mamón", "mamona",
    "idiota", "imbécil", "estúpido", "estúpida", "retrasado", "retrasada", "mogólico", "mogólica",
    // Racist slurs
    "negro de mierda", "sudaca", "moro", "panchito", "chino de mierda", "gitano", "gitana",
    // Homophobic slurs
    "maricón", "maricon", "marica", "gay de mierda", "bollera", "tortillera", "travelo",
    "sidoso", "sidosa", "trolo", "puto marica",
    // Misogynist slurs
    "feminazi", "guarra", "perra", "furcia", "ramera", "golfa",
    // Threats and incitement
    "te mato", "te voy a matar", "ojalá te mueras", "ojalá mueras", "suicídate", "muérete",
    "violación", "violar", "te voy a violar",
    // English (common in gaming chat)
    "fuck", "shit", "bitch", "asshole", "nigger", "faggot", "cunt", "dick", "pussy",
    "motherfucker", "retard", "retarded",
];

/// Names reserved for site staff. Combined with `BANNED_TERMS` for author names.
pub const RESERVED_NAMES: &[&str] = &[
    "admin", "administrador", "administrator", "moderador", "moderator", "webmaster", "soporte",
    "support",
];

/// Leetspeak-tolerant variants of the worst terms (p0ta, mar1c0n, n1gg3r...).
pub const OBFUSCATION_PATTERNS: &[&str] = &[
    r"(?i)p[u*0]t[a@4]",
    r"(?i)m[a@4]r[i1!]c[o0*]",
    r"(?i)c[a@4]br[o0*]n",
    r"(?i)j[o0]d[e3*]r",
    r"(?i)m[i1!][e3*]rd[a@4]",
    r"(?i)n[i1!]gg[a@4e3*]r",
    r"(?i)f[a@4]gg[o0*]t",
    r"(?i)r[e3*]tr[a@4]s[a@4]d[o0*]",
];
