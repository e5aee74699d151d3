//! Per-locale stopword lists.
//!
//! Words are listed in their natural spelling; the registry folds them with
//! the same pipeline as document text before lookup. Locales without a list
//! (Arabic, Greek, Indonesian, Irish, Lithuanian, Romanian, Tamil) keep
//! every token.

use crate::lang::Language;

const DANISH: &[&str] = &[
    "og", "i", "jeg", "det", "at", "en", "den", "til", "er", "som", "på", "de", "med", "han",
    "af", "for", "ikke", "der", "var", "mig", "sig", "men", "et", "har", "om", "vi", "min",
    "havde", "ham", "hun", "nu", "over", "da", "fra", "du", "ud", "sin", "dem", "os", "op",
    "man", "hans", "hvor", "eller", "hvad", "skal", "selv", "her", "alle", "vil", "blev",
];

const DUTCH: &[&str] = &[
    "de", "en", "van", "ik", "te", "dat", "die", "in", "een", "hij", "het", "niet", "zijn",
    "is", "was", "op", "aan", "met", "als", "voor", "had", "er", "maar", "om", "hem", "dan",
    "zou", "of", "wat", "mijn", "men", "dit", "zo", "door", "over", "ze", "zich", "bij", "ook",
    "tot", "je", "mij", "uit", "der", "daar", "haar", "naar", "heb", "hoe", "heeft", "hebben",
];

const ENGLISH: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how",
    "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more", "most", "my",
    "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "out",
    "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "you", "your",
];

const FINNISH: &[&str] = &[
    "olla", "olen", "olet", "on", "olemme", "olette", "ovat", "ole", "oli", "olisi", "ollut",
    "minä", "sinä", "hän", "me", "te", "he", "tämä", "tuo", "se", "nämä", "ne", "mikä", "kuka",
    "joka", "että", "ja", "jos", "koska", "kuin", "mutta", "niin", "sekä", "sillä", "tai",
    "vaan", "vai", "vaikka", "kanssa", "mukaan", "noin", "poikki", "yli", "kun", "nyt", "itse",
];

const FRENCH: &[&str] = &[
    "au", "aux", "avec", "ce", "ces", "dans", "de", "des", "du", "elle", "en", "et", "eux",
    "il", "je", "la", "le", "les", "leur", "lui", "ma", "mais", "me", "même", "mes", "moi",
    "mon", "ne", "nos", "notre", "nous", "on", "ou", "par", "pas", "pour", "qu", "que", "qui",
    "sa", "se", "ses", "son", "sur", "ta", "te", "tes", "toi", "ton", "tu", "un", "une", "vos",
    "votre", "vous", "c", "d", "j", "l", "à", "m", "n", "s", "t", "y", "été", "est", "sont",
];

const GERMAN: &[&str] = &[
    "aber", "alle", "als", "also", "am", "an", "auch", "auf", "aus", "bei", "bin", "bis",
    "bist", "da", "damit", "dann", "das", "dass", "dem", "den", "der", "des", "die", "doch",
    "du", "durch", "ein", "eine", "einem", "einen", "einer", "eines", "er", "es", "für", "hat",
    "hatte", "ich", "ihr", "im", "in", "ist", "ja", "kein", "man", "mit", "nach", "nicht",
    "noch", "nur", "oder", "sich", "sie", "sind", "so", "über", "um", "und", "uns", "von",
    "vor", "war", "was", "wie", "wir", "wird", "zu", "zum", "zur",
];

const HUNGARIAN: &[&str] = &[
    "a", "az", "egy", "és", "hogy", "nem", "is", "de", "meg", "már", "csak", "mint", "ez",
    "azt", "van", "volt", "el", "ki", "fel", "be", "még", "mert", "vagy", "sem", "ha", "mi",
    "ő", "én", "te", "ők", "mely", "amely", "pedig", "után", "szerint", "között", "által",
];

const ITALIAN: &[&str] = &[
    "ad", "al", "allo", "ai", "agli", "alla", "alle", "con", "col", "da", "dal", "dalla",
    "dei", "del", "della", "delle", "di", "e", "ed", "gli", "il", "in", "io", "la", "le", "lo",
    "ma", "mi", "ne", "nel", "nella", "non", "o", "per", "più", "quale", "quando", "questo",
    "se", "si", "sono", "su", "sul", "sulla", "ti", "tra", "tu", "un", "una", "uno", "è",
    "che", "chi", "come", "anche",
];

const NEPALI: &[&str] = &[
    "र", "छ", "छन्", "हो", "भने", "पनि", "को", "का", "की", "मा", "ले", "लाई", "बाट", "त्यो",
    "यो", "यस", "उनी", "हामी", "तपाईं", "गर्न", "गरेको", "थियो", "भएको", "तर", "वा", "नै",
];

const NORWEGIAN: &[&str] = &[
    "og", "i", "jeg", "det", "at", "en", "et", "den", "til", "er", "som", "på", "de", "med",
    "han", "av", "ikke", "der", "så", "var", "meg", "seg", "men", "ett", "har", "om", "vi",
    "min", "mitt", "ha", "hadde", "hun", "nå", "over", "da", "ved", "fra", "du", "ut", "sin",
    "dem", "oss", "opp", "man", "kan", "hans", "hvor", "eller", "hva", "skal", "selv", "her",
];

const PORTUGUESE: &[&str] = &[
    "a", "ao", "aos", "as", "à", "com", "como", "da", "das", "de", "do", "dos", "e", "é",
    "ela", "ele", "em", "entre", "era", "eu", "foi", "há", "isso", "já", "lhe", "mais", "mas",
    "me", "na", "nas", "não", "no", "nos", "o", "os", "ou", "para", "pela", "pelo", "por",
    "que", "se", "sem", "seu", "sua", "são", "também", "um", "uma", "você",
];

const RUSSIAN: &[&str] = &[
    "и", "в", "во", "не", "что", "он", "на", "я", "с", "со", "как", "а", "то", "все", "она",
    "так", "его", "но", "да", "ты", "к", "у", "же", "вы", "за", "бы", "по", "только", "ее",
    "мне", "было", "вот", "от", "меня", "еще", "нет", "о", "из", "ему", "теперь", "когда",
    "ли", "если", "уже", "или", "ни", "быть", "был", "до", "вас", "они", "мы", "это",
];

const SPANISH: &[&str] = &[
    "de", "la", "que", "el", "en", "y", "a", "los", "del", "se", "las", "por", "un", "para",
    "con", "no", "una", "su", "al", "lo", "como", "más", "pero", "sus", "le", "ya", "o",
    "este", "sí", "porque", "esta", "entre", "cuando", "muy", "sin", "sobre", "también", "me",
    "hasta", "hay", "donde", "quien", "desde", "todo", "nos", "durante", "es", "son", "fue",
];

const SWEDISH: &[&str] = &[
    "och", "det", "att", "i", "en", "jag", "hon", "som", "han", "på", "den", "med", "var",
    "sig", "för", "så", "till", "är", "men", "ett", "om", "hade", "de", "av", "icke", "mig",
    "du", "henne", "då", "sin", "nu", "har", "inte", "hans", "honom", "skulle", "hennes",
    "där", "min", "man", "ej", "vid", "kunde", "något", "från", "ut", "när", "efter", "upp",
];

const TURKISH: &[&str] = &[
    "acaba", "ama", "ancak", "bazı", "belki", "ben", "bir", "biz", "bu", "çok", "çünkü", "da",
    "daha", "de", "defa", "diye", "en", "gibi", "hem", "hep", "hepsi", "her", "için", "ile",
    "ise", "kez", "ki", "kim", "mı", "mu", "mü", "nasıl", "ne", "neden", "nerde", "niçin",
    "o", "sanki", "siz", "şey", "şu", "tüm", "ve", "veya", "ya", "yani",
];

/// Stopwords for `language`, unfolded. Empty for locales without a list.
pub(crate) fn for_language(language: Language) -> &'static [&'static str] {
    match language {
        Language::Danish => DANISH,
        Language::Dutch => DUTCH,
        Language::English => ENGLISH,
        Language::Finnish => FINNISH,
        Language::French => FRENCH,
        Language::German => GERMAN,
        Language::Hungarian => HUNGARIAN,
        Language::Italian => ITALIAN,
        Language::Nepali => NEPALI,
        Language::Norwegian => NORWEGIAN,
        Language::Portuguese => PORTUGUESE,
        Language::Russian => RUSSIAN,
        Language::Spanish => SPANISH,
        Language::Swedish => SWEDISH,
        Language::Turkish => TURKISH,
        Language::Arabic
        | Language::Greek
        | Language::Indonesian
        | Language::Irish
        | Language::Lithuanian
        | Language::Romanian
        | Language::Tamil => &[],
    }
}
