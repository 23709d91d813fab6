//! Abbreviation matching for verbs and exits.

/// Tokens longer than this get no spelling suggestion.
pub const SUGGEST_MAX_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Index of the chosen option.
    Unique(usize),
    /// Several options fit equally well, or the user asked for a listing
    /// with `?`.
    Ambiguous {
        candidates: Vec<String>,
        listing: bool,
    },
    /// Nothing fits; this is the closest option by edit distance.
    Suggestion(String),
    /// Nothing fits and the token is too long to guess at.
    Unknown(String),
    /// Empty token or empty option set.
    Empty,
}

impl Resolution {
    pub fn index(&self) -> Option<usize> {
        match self {
            Resolution::Unique(i) => Some(*i),
            _ => None,
        }
    }

    /// Lines to show the user when no option was chosen.
    pub fn prompt(&self) -> Vec<String> {
        match self {
            Resolution::Unique(_) | Resolution::Empty => Vec::new(),
            Resolution::Ambiguous {
                candidates,
                listing,
            } => {
                let mark = if *listing { '.' } else { '?' };
                candidates
                    .iter()
                    .map(|c| format!("{}{mark}", capitalize(c)))
                    .collect()
            }
            Resolution::Suggestion(s) => vec![format!("Try {s}?")],
            Resolution::Unknown(token) => vec![format!("{}?", capitalize(token))],
        }
    }
}

/// Pick the option the user most likely meant by `token`.
///
/// A case-insensitive prefix scores its typed length. The best score wins
/// outright when the runner-up scores lower or when the token spells the
/// whole option. A `?` anywhere in the token lists every best match instead;
/// only the text before it is compared.
pub fn resolve<S: AsRef<str>>(token: &str, options: &[S]) -> Resolution {
    if token.is_empty() || options.is_empty() {
        return Resolution::Empty;
    }

    let (typed, listing) = match token.find('?') {
        Some(i) => (&token[..i], true),
        None => (token, false),
    };

    let mut ranked: Vec<(usize, &str, usize)> = options
        .iter()
        .enumerate()
        .map(|(i, o)| (i, o.as_ref(), prefix_score(typed, o.as_ref())))
        .collect();
    ranked.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(b.1)));

    let (top_index, top, top_score) = ranked[0];
    if !listing && top_score > 0 {
        let runner_up = ranked.get(1).map_or(0, |r| r.2);
        if runner_up < top_score || top.chars().count() == top_score {
            return Resolution::Unique(top_index);
        }
    }

    if listing || top_score > 0 {
        let candidates = ranked
            .iter()
            .take_while(|r| r.2 == top_score)
            .map(|r| r.1.to_string())
            .collect();
        return Resolution::Ambiguous {
            candidates,
            listing,
        };
    }

    if token.chars().count() > SUGGEST_MAX_LEN {
        return Resolution::Unknown(token.to_string());
    }

    options
        .iter()
        .map(|o| (levenshtein(token, o.as_ref()), o.as_ref()))
        .min()
        .map(|(_, best)| Resolution::Suggestion(best.to_string()))
        .unwrap_or(Resolution::Empty)
}

fn prefix_score(typed: &str, option: &str) -> usize {
    let mut rest = option.chars();
    let mut score = 0;
    for t in typed.chars() {
        match rest.next() {
            Some(o) if o.eq_ignore_ascii_case(&t) => score += 1,
            _ => return 0,
        }
    }
    score
}

/// Edit distance with unit costs. Case-sensitive.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut d = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        d[0][j] = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            d[i][j] = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
        }
    }
    d[a.len()][b.len()]
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
