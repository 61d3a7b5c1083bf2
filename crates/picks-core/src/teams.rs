//! Team nickname/abbreviation directory used to collapse differently-written subjects
//! ("LAL", "Los Angeles Lakers", "lakers") onto one canonical nickname.

use crate::Sport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamEntry {
    pub city: &'static str,
    pub nickname: &'static str,
    pub aliases: &'static [&'static str],
    pub sport: Sport,
}

const fn team(
    city: &'static str,
    nickname: &'static str,
    aliases: &'static [&'static str],
    sport: Sport,
) -> TeamEntry {
    TeamEntry {
        city,
        nickname,
        aliases,
        sport,
    }
}

static TEAMS: &[TeamEntry] = &[
    // NBA
    team("Atlanta", "Hawks", &["ATL"], Sport::Nba),
    team("Boston", "Celtics", &["BOS"], Sport::Nba),
    team("Brooklyn", "Nets", &["BKN", "BRK"], Sport::Nba),
    team("Charlotte", "Hornets", &["CHA"], Sport::Nba),
    team("Chicago", "Bulls", &["CHI"], Sport::Nba),
    team("Cleveland", "Cavaliers", &["CLE", "Cavs"], Sport::Nba),
    team("Dallas", "Mavericks", &["DAL", "Mavs"], Sport::Nba),
    team("Denver", "Nuggets", &["DEN"], Sport::Nba),
    team("Detroit", "Pistons", &["DET"], Sport::Nba),
    team("Golden State", "Warriors", &["GSW", "GS"], Sport::Nba),
    team("Houston", "Rockets", &["HOU"], Sport::Nba),
    team("Indiana", "Pacers", &["IND"], Sport::Nba),
    team("Los Angeles", "Clippers", &["LAC", "Clips"], Sport::Nba),
    team("Los Angeles", "Lakers", &["LAL"], Sport::Nba),
    team("Memphis", "Grizzlies", &["MEM", "Grizz"], Sport::Nba),
    team("Miami", "Heat", &["MIA"], Sport::Nba),
    team("Milwaukee", "Bucks", &["MIL"], Sport::Nba),
    team("Minnesota", "Timberwolves", &["MIN", "Wolves"], Sport::Nba),
    team("New Orleans", "Pelicans", &["NOP", "NO", "Pels"], Sport::Nba),
    team("New York", "Knicks", &["NYK"], Sport::Nba),
    team("Oklahoma City", "Thunder", &["OKC"], Sport::Nba),
    team("Orlando", "Magic", &["ORL"], Sport::Nba),
    team("Philadelphia", "76ers", &["PHI", "Sixers"], Sport::Nba),
    team("Phoenix", "Suns", &["PHX", "PHO"], Sport::Nba),
    team("Portland", "Trail Blazers", &["POR", "Blazers"], Sport::Nba),
    team("Sacramento", "Kings", &["SAC"], Sport::Nba),
    team("San Antonio", "Spurs", &["SAS", "SA"], Sport::Nba),
    team("Toronto", "Raptors", &["TOR", "Raps"], Sport::Nba),
    team("Utah", "Jazz", &["UTA"], Sport::Nba),
    team("Washington", "Wizards", &["WAS", "WSH", "Wiz"], Sport::Nba),
    // NFL
    team("Arizona", "Cardinals", &["ARI"], Sport::Nfl),
    team("Atlanta", "Falcons", &["ATL"], Sport::Nfl),
    team("Baltimore", "Ravens", &["BAL"], Sport::Nfl),
    team("Buffalo", "Bills", &["BUF"], Sport::Nfl),
    team("Carolina", "Panthers", &["CAR"], Sport::Nfl),
    team("Chicago", "Bears", &["CHI"], Sport::Nfl),
    team("Cincinnati", "Bengals", &["CIN"], Sport::Nfl),
    team("Cleveland", "Browns", &["CLE"], Sport::Nfl),
    team("Dallas", "Cowboys", &["DAL"], Sport::Nfl),
    team("Denver", "Broncos", &["DEN"], Sport::Nfl),
    team("Detroit", "Lions", &["DET"], Sport::Nfl),
    team("Green Bay", "Packers", &["GB"], Sport::Nfl),
    team("Houston", "Texans", &["HOU"], Sport::Nfl),
    team("Indianapolis", "Colts", &["IND"], Sport::Nfl),
    team("Jacksonville", "Jaguars", &["JAX", "Jags"], Sport::Nfl),
    team("Kansas City", "Chiefs", &["KC"], Sport::Nfl),
    team("Las Vegas", "Raiders", &["LV"], Sport::Nfl),
    team("Los Angeles", "Chargers", &["LAC"], Sport::Nfl),
    team("Los Angeles", "Rams", &["LAR"], Sport::Nfl),
    team("Miami", "Dolphins", &["MIA", "Fins"], Sport::Nfl),
    team("Minnesota", "Vikings", &["MIN", "Vikes"], Sport::Nfl),
    team("New England", "Patriots", &["NE", "Pats"], Sport::Nfl),
    team("New Orleans", "Saints", &["NO"], Sport::Nfl),
    team("New York", "Giants", &["NYG"], Sport::Nfl),
    team("New York", "Jets", &["NYJ"], Sport::Nfl),
    team("Philadelphia", "Eagles", &["PHI"], Sport::Nfl),
    team("Pittsburgh", "Steelers", &["PIT"], Sport::Nfl),
    team("San Francisco", "49ers", &["SF", "Niners"], Sport::Nfl),
    team("Seattle", "Seahawks", &["SEA"], Sport::Nfl),
    team("Tampa Bay", "Buccaneers", &["TB", "Bucs"], Sport::Nfl),
    team("Tennessee", "Titans", &["TEN"], Sport::Nfl),
    team("Washington", "Commanders", &["WAS", "WSH"], Sport::Nfl),
    // NHL
    team("Anaheim", "Ducks", &["ANA"], Sport::Nhl),
    team("Boston", "Bruins", &["BOS"], Sport::Nhl),
    team("Buffalo", "Sabres", &["BUF"], Sport::Nhl),
    team("Calgary", "Flames", &["CGY"], Sport::Nhl),
    team("Carolina", "Hurricanes", &["CAR", "Canes"], Sport::Nhl),
    team("Chicago", "Blackhawks", &["CHI", "Hawks"], Sport::Nhl),
    team("Colorado", "Avalanche", &["COL", "Avs"], Sport::Nhl),
    team("Columbus", "Blue Jackets", &["CBJ"], Sport::Nhl),
    team("Dallas", "Stars", &["DAL"], Sport::Nhl),
    team("Detroit", "Red Wings", &["DET"], Sport::Nhl),
    team("Edmonton", "Oilers", &["EDM"], Sport::Nhl),
    team("Florida", "Panthers", &["FLA"], Sport::Nhl),
    team("Los Angeles", "Kings", &["LAK"], Sport::Nhl),
    team("Minnesota", "Wild", &["MIN"], Sport::Nhl),
    team("Montreal", "Canadiens", &["MTL", "Habs"], Sport::Nhl),
    team("Nashville", "Predators", &["NSH", "Preds"], Sport::Nhl),
    team("New Jersey", "Devils", &["NJD", "NJ"], Sport::Nhl),
    team("New York", "Islanders", &["NYI", "Isles"], Sport::Nhl),
    team("New York", "Rangers", &["NYR"], Sport::Nhl),
    team("Ottawa", "Senators", &["OTT", "Sens"], Sport::Nhl),
    team("Philadelphia", "Flyers", &["PHI"], Sport::Nhl),
    team("Pittsburgh", "Penguins", &["PIT", "Pens"], Sport::Nhl),
    team("San Jose", "Sharks", &["SJS", "SJ"], Sport::Nhl),
    team("Seattle", "Kraken", &["SEA"], Sport::Nhl),
    team("St. Louis", "Blues", &["STL"], Sport::Nhl),
    team("Tampa Bay", "Lightning", &["TBL", "Bolts"], Sport::Nhl),
    team("Toronto", "Maple Leafs", &["TOR", "Leafs"], Sport::Nhl),
    team("Utah", "Mammoth", &["UTA"], Sport::Nhl),
    team("Vancouver", "Canucks", &["VAN"], Sport::Nhl),
    team("Vegas", "Golden Knights", &["VGK", "Vegas"], Sport::Nhl),
    team("Washington", "Capitals", &["WSH", "Caps"], Sport::Nhl),
    team("Winnipeg", "Jets", &["WPG"], Sport::Nhl),
];

/// Words that precede a team name in casual posts and never belong to the subject.
const FILLER_WORDS: &[&str] = &[
    "a", "and", "bet", "betting", "hammer", "hammering", "i", "im", "i'm", "lean", "leaning",
    "like", "liking", "lock", "love", "my", "on", "pick", "play", "riding", "take", "taking", "the",
    "with",
];

impl TeamEntry {
    /// Nickname, abbreviation/alias, or "{city} {nickname}", case-insensitively.
    fn answers_to(&self, name: &str) -> bool {
        if self.nickname.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        {
            return true;
        }
        let full = name.split_whitespace().collect::<Vec<_>>().join(" ");
        match full.split_at_checked(self.city.len()) {
            Some((city, rest)) => {
                city.eq_ignore_ascii_case(self.city)
                    && rest
                        .strip_prefix(' ')
                        .is_some_and(|nick| nick.eq_ignore_ascii_case(self.nickname))
            }
            None => false,
        }
    }
}

pub struct TeamDirectory;

impl TeamDirectory {
    pub fn entries() -> &'static [TeamEntry] {
        TEAMS
    }

    /// Resolve a nickname or abbreviation. Names shared across leagues only resolve when the
    /// sport hint picks exactly one of them.
    pub fn resolve(name: &str, hint: Option<Sport>) -> Option<&'static TeamEntry> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let candidates: Vec<&'static TeamEntry> = TEAMS
            .iter()
            .filter(|t| t.answers_to(name))
            .collect();

        match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            many => {
                let hint = hint?;
                let mut in_sport = many.iter().filter(|t| t.sport == hint);
                match (in_sport.next(), in_sport.next()) {
                    (Some(team), None) => Some(*team),
                    _ => None,
                }
            }
        }
    }
}

fn trailing_team(words: &[&str], hint: Option<Sport>) -> Option<(usize, &'static TeamEntry)> {
    (0..words.len()).find_map(|start| {
        TeamDirectory::resolve(&words[start..].join(" "), hint).map(|team| (start, team))
    })
}

fn strip_filler(raw: &str, words: &[&str]) -> String {
    let kept: Vec<&str> = words
        .iter()
        .skip_while(|w| FILLER_WORDS.contains(&w.to_ascii_lowercase().as_str()))
        .copied()
        .collect();
    if kept.is_empty() {
        raw.trim().to_string()
    } else {
        kept.join(" ")
    }
}

/// Canonical subject for a captured phrase. The longest trailing run of words that resolves to a
/// team (nickname, alias, or city plus nickname) wins; otherwise leading filler words are
/// stripped and the remainder kept verbatim.
pub fn normalize_subject(raw: &str, hint: Option<Sport>) -> String {
    let words: Vec<&str> = raw.split_whitespace().collect();
    match trailing_team(&words, hint) {
        Some((_, team)) => team.nickname.to_string(),
        None => strip_filler(raw, &words),
    }
}

/// Same selection as [`normalize_subject`] but keeps the words as they were written
/// ("my lock LAL" → "LAL").
pub fn subject_as_written(raw: &str, hint: Option<Sport>) -> String {
    let words: Vec<&str> = raw.split_whitespace().collect();
    match trailing_team(&words, hint) {
        Some((start, _)) => words[start..].join(" "),
        None => strip_filler(raw, &words),
    }
}
