//! Conversation-scoped mini-game sessions.
//!
//! At most one live session per conversation per game kind. Sessions are
//! created on the first command when none is active and destroyed on any
//! terminal transition (win, loss, draw, timeout). All state is in memory;
//! a restart clears every session by contract.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use crate::error::CommandError;
use crate::scheduler::{self, TaskHandle};
use crate::transport::{ActorId, ChatTransport, ConversationId};

// ========== Board game ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Player,
    Bot,
}

/// The 8 winning line patterns of the 3×3 grid
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    PlayerWin,
    BotWin,
    Draw,
    Continue { bot_cell: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    OutOfRange,
    CellTaken,
}

#[derive(Debug, Clone)]
pub struct BoardGame {
    pub cells: [Cell; 9],
    pub started_by: ActorId,
}

impl BoardGame {
    pub fn new(started_by: ActorId) -> Self {
        Self {
            cells: [Cell::Empty; 9],
            started_by,
        }
    }

    /// One full turn: place the player mark, check for a terminal state,
    /// otherwise play the bot's reply (first empty cell) and re-check.
    pub fn apply_move(&mut self, cell: usize) -> Result<MoveOutcome, MoveError> {
        if cell >= 9 {
            return Err(MoveError::OutOfRange);
        }
        if self.cells[cell] != Cell::Empty {
            return Err(MoveError::CellTaken);
        }

        self.cells[cell] = Cell::Player;
        if self.wins(Cell::Player) {
            return Ok(MoveOutcome::PlayerWin);
        }
        if self.is_full() {
            return Ok(MoveOutcome::Draw);
        }

        // Deliberately beatable: take the first empty cell
        let bot_cell = match self.first_empty() {
            Some(i) => i,
            None => return Ok(MoveOutcome::Draw),
        };
        self.cells[bot_cell] = Cell::Bot;
        if self.wins(Cell::Bot) {
            return Ok(MoveOutcome::BotWin);
        }
        if self.is_full() {
            return Ok(MoveOutcome::Draw);
        }
        Ok(MoveOutcome::Continue { bot_cell })
    }

    fn wins(&self, mark: Cell) -> bool {
        WIN_LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == mark))
    }

    fn is_full(&self) -> bool {
        self.cells.iter().all(|&c| c != Cell::Empty)
    }

    fn first_empty(&self) -> Option<usize> {
        self.cells.iter().position(|&c| c == Cell::Empty)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in 0..3 {
            let mut line = String::new();
            for col in 0..3 {
                let i = row * 3 + col;
                let mark = match self.cells[i] {
                    Cell::Empty => (i + 1).to_string(),
                    Cell::Player => "X".to_string(),
                    Cell::Bot => "O".to_string(),
                };
                if col > 0 {
                    line.push_str(" | ");
                }
                line.push_str(&mark);
            }
            out.push_str(&format!(" {} \n", line));
            if row < 2 {
                out.push_str("---+---+---\n");
            }
        }
        out
    }
}

// ========== Word guessing ==========

pub const MAX_WRONG: u8 = 6;

const WORDS: &[&str] = &[
    "keyboard", "network", "balance", "whisper", "lantern", "voyage", "puzzle", "meteor",
    "harbor", "gateway",
];

const GALLOWS: [&str; 7] = [
    "  +---+\n  |   |\n      |\n      |\n      |\n=======",
    "  +---+\n  |   |\n  O   |\n      |\n      |\n=======",
    "  +---+\n  |   |\n  O   |\n  |   |\n      |\n=======",
    "  +---+\n  |   |\n  O   |\n /|   |\n      |\n=======",
    "  +---+\n  |   |\n  O   |\n /|\\  |\n      |\n=======",
    "  +---+\n  |   |\n  O   |\n /|\\  |\n /    |\n=======",
    "  +---+\n  |   |\n  O   |\n /|\\  |\n / \\  |\n=======",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    Won,
    Lost,
    GoodGuess,
    BadGuess,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessError {
    AlreadyGuessed,
    NotALetter,
}

#[derive(Debug, Clone)]
pub struct WordGuess {
    word: String,
    guessed: BTreeSet<char>,
    wrong: u8,
    pub started_by: ActorId,
}

impl WordGuess {
    pub fn new(word: &str, started_by: ActorId) -> Self {
        Self {
            word: word.to_ascii_lowercase(),
            guessed: BTreeSet::new(),
            wrong: 0,
            started_by,
        }
    }

    pub fn random(started_by: ActorId) -> Self {
        let word = WORDS[rand::thread_rng().gen_range(0..WORDS.len())];
        Self::new(word, started_by)
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn wrong(&self) -> u8 {
        self.wrong
    }

    /// Guess a single letter. Repeats are rejected without costing a life;
    /// a correct letter reveals every occurrence at once.
    pub fn guess_letter(&mut self, letter: char) -> Result<GuessOutcome, GuessError> {
        let letter = letter.to_ascii_lowercase();
        if !letter.is_ascii_alphabetic() {
            return Err(GuessError::NotALetter);
        }
        if !self.guessed.insert(letter) {
            return Err(GuessError::AlreadyGuessed);
        }

        if self.word.contains(letter) {
            if self.is_revealed() {
                Ok(GuessOutcome::Won)
            } else {
                Ok(GuessOutcome::GoodGuess)
            }
        } else {
            self.wrong += 1;
            if self.wrong >= MAX_WRONG {
                Ok(GuessOutcome::Lost)
            } else {
                Ok(GuessOutcome::BadGuess)
            }
        }
    }

    /// Guess the whole word in one go.
    pub fn guess_word(&mut self, attempt: &str) -> GuessOutcome {
        if attempt.eq_ignore_ascii_case(&self.word) {
            return GuessOutcome::Won;
        }
        self.wrong += 1;
        if self.wrong >= MAX_WRONG {
            GuessOutcome::Lost
        } else {
            GuessOutcome::BadGuess
        }
    }

    pub fn is_revealed(&self) -> bool {
        self.word.chars().all(|c| self.guessed.contains(&c))
    }

    pub fn masked(&self) -> String {
        self.word
            .chars()
            .map(|c| {
                if self.guessed.contains(&c) {
                    c.to_string()
                } else {
                    "_".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn render(&self) -> String {
        let guessed = if self.guessed.is_empty() {
            "none".to_string()
        } else {
            self.guessed
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "{}\n\n📝 Word: {}\n❌ Wrong guesses: {}/{}\n🔤 Guessed: {}",
            GALLOWS[self.wrong.min(6) as usize],
            self.masked(),
            self.wrong,
            MAX_WRONG,
            guessed
        )
    }
}

// ========== Trivia ==========

#[derive(Debug, Clone, Copy)]
pub struct TriviaQuestion {
    pub question: &'static str,
    pub options: [&'static str; 4],
    pub answer: usize,
    pub explanation: &'static str,
}

const TRIVIA_BANK: &[TriviaQuestion] = &[
    TriviaQuestion {
        question: "What does HTML stand for?",
        options: [
            "Hyper Text Markup Language",
            "High Tech Modern Language",
            "Home Tool Markup Language",
            "Hyperlink and Text Markup Language",
        ],
        answer: 0,
        explanation: "HTML is the standard markup language for web pages.",
    },
    TriviaQuestion {
        question: "Which planet is known as the Red Planet?",
        options: ["Venus", "Mars", "Jupiter", "Saturn"],
        answer: 1,
        explanation: "Iron oxide on the surface gives Mars its reddish color.",
    },
    TriviaQuestion {
        question: "What is the largest mammal in the world?",
        options: ["Elephant", "Giraffe", "Blue Whale", "Hippopotamus"],
        answer: 2,
        explanation: "The blue whale is the largest animal known to have lived.",
    },
    TriviaQuestion {
        question: "How many continents are there on Earth?",
        options: ["Five", "Six", "Seven", "Eight"],
        answer: 2,
        explanation: "The usual count is seven continents.",
    },
    TriviaQuestion {
        question: "Which gas do plants absorb from the atmosphere?",
        options: ["Oxygen", "Nitrogen", "Hydrogen", "Carbon dioxide"],
        answer: 3,
        explanation: "Photosynthesis consumes carbon dioxide and releases oxygen.",
    },
    TriviaQuestion {
        question: "What is the chemical symbol for gold?",
        options: ["Go", "Gd", "Au", "Ag"],
        answer: 2,
        explanation: "Au comes from the Latin 'aurum'.",
    },
];

pub fn option_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

#[derive(Debug, Clone)]
struct TriviaSession {
    conversation: ConversationId,
    question: &'static TriviaQuestion,
}

// ========== Engine ==========

#[derive(Default)]
struct EngineState {
    boards: HashMap<String, BoardGame>,
    words: HashMap<String, WordGuess>,
    trivia: HashMap<u64, TriviaSession>,
    /// Newest open trivia session per conversation
    open_trivia: HashMap<String, u64>,
    trivia_timers: HashMap<u64, TaskHandle>,
    next_trivia_id: u64,
}

pub struct GameEngine {
    inner: Arc<Mutex<EngineState>>,
    transport: Arc<dyn ChatTransport>,
    trivia_timeout: Duration,
}

impl GameEngine {
    pub fn new(transport: Arc<dyn ChatTransport>, trivia_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineState::default())),
            transport,
            trivia_timeout,
        }
    }

    /// Start a board game or play a move in the running one.
    pub fn board_move(
        &self,
        conversation: &ConversationId,
        actor: &ActorId,
        arg: Option<&str>,
    ) -> Result<String, CommandError> {
        let key = conversation.as_str().to_string();
        let mut state = self.inner.lock().unwrap();

        if !state.boards.contains_key(&key) {
            let game = BoardGame::new(actor.clone());
            let board = game.render();
            state.boards.insert(key, game);
            return Ok(format!(
                "🎮 Tic-tac-toe started! You are X, I am O.\nPick a cell (1-9):\n\n{}",
                board
            ));
        }

        let cell: usize = arg
            .and_then(|a| a.parse::<usize>().ok())
            .filter(|&c| (1..=9).contains(&c))
            .ok_or_else(|| CommandError::Usage("ttt [1-9]".into()))?;

        let game = match state.boards.get_mut(&key) {
            Some(game) => game,
            None => return Err(CommandError::Internal("board session vanished".into())),
        };

        match game.apply_move(cell - 1) {
            Err(MoveError::OutOfRange) => Err(CommandError::Usage("ttt [1-9]".into())),
            Err(MoveError::CellTaken) => {
                Ok("❌ That cell is already taken. Pick another one.".into())
            }
            Ok(MoveOutcome::PlayerWin) => {
                let board = game.render();
                state.boards.remove(&key);
                Ok(format!("🎉 You won! Well played.\n\n{}", board))
            }
            Ok(MoveOutcome::BotWin) => {
                let board = game.render();
                state.boards.remove(&key);
                Ok(format!("🤖 I win! Better luck next time.\n\n{}", board))
            }
            Ok(MoveOutcome::Draw) => {
                let board = game.render();
                state.boards.remove(&key);
                Ok(format!("🤝 It's a draw!\n\n{}", board))
            }
            Ok(MoveOutcome::Continue { .. }) => {
                Ok(format!("🎮 Your turn! Pick a cell (1-9):\n\n{}", game.render()))
            }
        }
    }

    /// Start a word-guess round or feed a guess to the running one.
    pub fn word_guess(
        &self,
        conversation: &ConversationId,
        actor: &ActorId,
        arg: Option<&str>,
    ) -> Result<String, CommandError> {
        let key = conversation.as_str().to_string();
        let mut state = self.inner.lock().unwrap();

        if !state.words.contains_key(&key) {
            let game = WordGuess::random(actor.clone());
            let rendered = game.render();
            state.words.insert(key, game);
            return Ok(format!(
                "🎪 Hangman started!\n\n{}\n\nGuess a letter or the whole word.",
                rendered
            ));
        }

        let guess = arg
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .ok_or_else(|| CommandError::Usage("hangman [letter or word]".into()))?;

        let game = match state.words.get_mut(&key) {
            Some(game) => game,
            None => return Err(CommandError::Internal("word session vanished".into())),
        };

        let outcome = if guess.chars().count() == 1 {
            let letter = guess.chars().next().unwrap_or('_');
            match game.guess_letter(letter) {
                Ok(outcome) => outcome,
                Err(GuessError::AlreadyGuessed) => {
                    return Ok("❌ You already guessed that letter!".into());
                }
                Err(GuessError::NotALetter) => {
                    return Err(CommandError::Usage("hangman [letter or word]".into()));
                }
            }
        } else {
            game.guess_word(guess)
        };

        match outcome {
            GuessOutcome::Won => {
                let word = game.word().to_uppercase();
                state.words.remove(&key);
                Ok(format!("🎉 Correct! The word was *{}*.", word))
            }
            GuessOutcome::Lost => {
                let word = game.word().to_uppercase();
                let gallows = GALLOWS[6];
                state.words.remove(&key);
                Ok(format!("💀 Game over! The word was *{}*.\n\n{}", word, gallows))
            }
            GuessOutcome::GoodGuess => Ok(format!("✅ Good guess!\n\n{}", game.render())),
            GuessOutcome::BadGuess => Ok(format!("❌ Nope!\n\n{}", game.render())),
        }
    }

    /// Ask a trivia question. One open question per conversation; the
    /// timeout broadcast fires unless an answer lands first.
    pub fn start_trivia(
        &self,
        conversation: &ConversationId,
        _actor: &ActorId,
    ) -> Result<String, CommandError> {
        let key = conversation.as_str().to_string();
        let mut state = self.inner.lock().unwrap();

        if state.open_trivia.contains_key(&key) {
            return Ok("🧠 There is already an open question here — answer it first!".into());
        }

        let question = &TRIVIA_BANK[rand::thread_rng().gen_range(0..TRIVIA_BANK.len())];
        let id = state.next_trivia_id;
        state.next_trivia_id += 1;

        state.trivia.insert(
            id,
            TriviaSession {
                conversation: conversation.clone(),
                question,
            },
        );
        state.open_trivia.insert(key, id);

        let timer = {
            let inner = self.inner.clone();
            let transport = self.transport.clone();
            scheduler::schedule(self.trivia_timeout, async move {
                let expired = {
                    let mut state = inner.lock().unwrap();
                    state.trivia_timers.remove(&id);
                    match state.trivia.remove(&id) {
                        Some(session) => {
                            let conv_key = session.conversation.as_str().to_string();
                            if state.open_trivia.get(&conv_key) == Some(&id) {
                                state.open_trivia.remove(&conv_key);
                            }
                            Some(session)
                        }
                        None => None,
                    }
                };
                if let Some(session) = expired {
                    let q = session.question;
                    let notice = format!(
                        "⏰ Time's up! The correct answer was {}) {}\n💡 {}",
                        option_letter(q.answer),
                        q.options[q.answer],
                        q.explanation
                    );
                    if let Err(e) = transport.send_message(&session.conversation, &notice).await {
                        warn!(error = %e, "failed to broadcast trivia timeout");
                    }
                }
            })
        };
        state.trivia_timers.insert(id, timer);

        let mut text = format!("🧠 Trivia!\n\n❓ {}\n\n", question.question);
        for (i, option) in question.options.iter().enumerate() {
            text.push_str(&format!("{}) {}\n", option_letter(i), option));
        }
        text.push_str(&format!(
            "\nReply with A, B, C or D — you have {} seconds!",
            self.trivia_timeout.as_secs()
        ));
        Ok(text)
    }

    /// Route a bare single-letter reply to the open trivia session, if any.
    /// Cancels the timeout when the question gets answered.
    pub fn try_answer(
        &self,
        conversation: &ConversationId,
        actor: &ActorId,
        text: &str,
    ) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.chars().count() != 1 {
            return None;
        }
        let letter = trimmed.chars().next()?.to_ascii_uppercase();
        if !('A'..='D').contains(&letter) {
            return None;
        }
        let picked = (letter as u8 - b'A') as usize;

        let session = {
            let mut state = self.inner.lock().unwrap();
            let key = conversation.as_str().to_string();
            let id = state.open_trivia.remove(&key)?;
            if let Some(timer) = state.trivia_timers.remove(&id) {
                timer.cancel();
            }
            state.trivia.remove(&id)?
        };

        let q = session.question;
        info!(conversation = %conversation, actor = %actor, picked = %letter, "trivia answered");
        if picked == q.answer {
            Some(format!(
                "🎉 @{} got it! {}) {} is correct.\n💡 {}",
                actor,
                option_letter(q.answer),
                q.options[q.answer],
                q.explanation
            ))
        } else {
            Some(format!(
                "❌ Not quite. The correct answer was {}) {}\n💡 {}",
                option_letter(q.answer),
                q.options[q.answer],
                q.explanation
            ))
        }
    }

    /// (board, word, trivia) live-session counts for the stats report.
    pub fn session_counts(&self) -> (usize, usize, usize) {
        let state = self.inner.lock().unwrap();
        (state.boards.len(), state.words.len(), state.trivia.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn actor(id: &str) -> ActorId {
        ActorId(id.to_string())
    }

    fn conv(id: &str) -> ConversationId {
        ConversationId(id.to_string())
    }

    fn engine(timeout_ms: u64) -> (GameEngine, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let engine = GameEngine::new(transport.clone(), Duration::from_millis(timeout_ms));
        (engine, transport)
    }

    // Board game

    #[test]
    fn test_board_reply_move_is_first_empty() {
        let mut game = BoardGame::new(actor("p1"));
        game.cells[0] = Cell::Player;
        game.cells[4] = Cell::Bot;

        // X _ _ / _ O _ / _ _ _ + move to index 2: no line completes,
        // the bot then occupies the first empty cell (index 1).
        let outcome = game.apply_move(2).unwrap();
        assert_eq!(outcome, MoveOutcome::Continue { bot_cell: 1 });
        assert_eq!(game.cells[2], Cell::Player);
        assert_eq!(game.cells[1], Cell::Bot);
    }

    #[test]
    fn test_board_win_detection() {
        for line in WIN_LINES {
            let mut game = BoardGame::new(actor("p1"));
            game.cells[line[0]] = Cell::Player;
            game.cells[line[1]] = Cell::Player;
            let outcome = game.apply_move(line[2]).unwrap();
            assert_eq!(outcome, MoveOutcome::PlayerWin, "line {:?}", line);
        }
    }

    #[test]
    fn test_board_rejects_taken_cell() {
        let mut game = BoardGame::new(actor("p1"));
        game.apply_move(0).unwrap();
        assert_eq!(game.apply_move(0).unwrap_err(), MoveError::CellTaken);
        assert_eq!(game.apply_move(1).unwrap_err(), MoveError::CellTaken); // bot took it
        assert_eq!(game.apply_move(9).unwrap_err(), MoveError::OutOfRange);
    }

    #[test]
    fn test_board_full_game_player_wins_column() {
        let (engine, _) = engine(1000);
        let c = conv("g1");
        let p = actor("p1");

        let intro = engine.board_move(&c, &p, None).unwrap();
        assert!(intro.contains("Tic-tac-toe started"));

        // Bot plays first-empty: cells 1 and 2 go to O while X takes the
        // 0-3-6 column.
        engine.board_move(&c, &p, Some("1")).unwrap();
        engine.board_move(&c, &p, Some("4")).unwrap();
        let last = engine.board_move(&c, &p, Some("7")).unwrap();
        assert!(last.contains("You won"), "got: {}", last);

        // Session destroyed on the terminal transition
        assert_eq!(engine.session_counts().0, 0);
    }

    #[test]
    fn test_board_session_is_per_conversation() {
        let (engine, _) = engine(1000);
        engine.board_move(&conv("g1"), &actor("p1"), None).unwrap();
        engine.board_move(&conv("g2"), &actor("p2"), None).unwrap();
        assert_eq!(engine.session_counts().0, 2);
    }

    // Word guess

    #[test]
    fn test_word_guess_reveals_all_occurrences() {
        let mut game = WordGuess::new("balloon", actor("p1"));
        game.guess_letter('l').unwrap();
        assert_eq!(game.masked(), "_ _ l l _ _ _");
        game.guess_letter('o').unwrap();
        assert_eq!(game.masked(), "_ _ l l o o _");
    }

    #[test]
    fn test_word_guess_repeat_rejected_without_penalty() {
        let mut game = WordGuess::new("rust", actor("p1"));
        game.guess_letter('z').unwrap();
        assert_eq!(game.wrong(), 1);
        assert_eq!(game.guess_letter('z').unwrap_err(), GuessError::AlreadyGuessed);
        assert_eq!(game.wrong(), 1);
    }

    #[test]
    fn test_word_guess_win_and_loss() {
        let mut game = WordGuess::new("rust", actor("p1"));
        game.guess_letter('r').unwrap();
        game.guess_letter('u').unwrap();
        game.guess_letter('s').unwrap();
        assert_eq!(game.guess_letter('t').unwrap(), GuessOutcome::Won);

        let mut doomed = WordGuess::new("rust", actor("p1"));
        for (i, letter) in ['a', 'b', 'c', 'd', 'e', 'f'].iter().enumerate() {
            let outcome = doomed.guess_letter(*letter).unwrap();
            if i < 5 {
                assert_eq!(outcome, GuessOutcome::BadGuess);
            } else {
                assert_eq!(outcome, GuessOutcome::Lost);
            }
        }
    }

    #[test]
    fn test_word_guess_full_word() {
        let mut game = WordGuess::new("rust", actor("p1"));
        assert_eq!(game.guess_word("RUST"), GuessOutcome::Won);

        let mut other = WordGuess::new("rust", actor("p1"));
        assert_eq!(other.guess_word("ruby"), GuessOutcome::BadGuess);
        assert_eq!(other.wrong(), 1);
    }

    #[test]
    fn test_word_engine_round_trip() {
        let (engine, _) = engine(1000);
        let c = conv("g1");
        let p = actor("p1");

        let intro = engine.word_guess(&c, &p, None).unwrap();
        assert!(intro.contains("Hangman started"));
        assert_eq!(engine.session_counts().1, 1);

        // Guessing the stored word ends the session
        let word = {
            let state = engine.inner.lock().unwrap();
            state.words[c.as_str()].word().to_string()
        };
        let reply = engine.word_guess(&c, &p, Some(&word)).unwrap();
        assert!(reply.contains("Correct"));
        assert_eq!(engine.session_counts().1, 0);
    }

    // Trivia

    #[tokio::test]
    async fn test_trivia_timeout_broadcasts_answer() {
        let (engine, transport) = engine(40);
        let c = conv("g1");

        let question = engine.start_trivia(&c, &actor("p1")).unwrap();
        assert!(question.contains("Trivia"));
        assert_eq!(engine.session_counts().2, 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(engine.session_counts().2, 0);
        let bodies = transport.sent_bodies();
        assert!(bodies.iter().any(|b| b.contains("Time's up")), "{:?}", bodies);
    }

    #[tokio::test]
    async fn test_trivia_answer_cancels_timeout() {
        let (engine, transport) = engine(40);
        let c = conv("g1");

        engine.start_trivia(&c, &actor("p1")).unwrap();
        let reply = engine.try_answer(&c, &actor("p2"), "a").unwrap();
        assert!(reply.contains("correct") || reply.contains("Not quite"));
        assert_eq!(engine.session_counts().2, 0);

        tokio::time::sleep(Duration::from_millis(120)).await;
        // No timeout broadcast after the question was answered
        assert!(transport.sent_bodies().is_empty());
    }

    #[tokio::test]
    async fn test_trivia_one_open_question_per_conversation() {
        let (engine, _) = engine(1000);
        let c = conv("g1");

        engine.start_trivia(&c, &actor("p1")).unwrap();
        let second = engine.start_trivia(&c, &actor("p2")).unwrap();
        assert!(second.contains("already an open question"));
        assert_eq!(engine.session_counts().2, 1);
    }

    #[test]
    fn test_try_answer_ignores_regular_chatter() {
        let (engine, _) = engine(1000);
        let c = conv("g1");
        assert!(engine.try_answer(&c, &actor("p1"), "hello there").is_none());
        assert!(engine.try_answer(&c, &actor("p1"), "a").is_none()); // no open question
        assert!(engine.try_answer(&c, &actor("p1"), "e").is_none());
    }
}
